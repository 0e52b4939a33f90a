use nanogpt_mcp::config::Config;
use nanogpt_mcp::mcp_gateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，stdout 留给 MCP 协议，日志只写 stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    // 加载配置
    let config = Config::new();
    log::info!(
        "{} {} starting, gateway: {}",
        config.app_name,
        config.app_version,
        config.base_url
    );

    let server = mcp_gateway::init_mcp_gateway(&config)?;

    // stdin 关闭即退出
    server.run_stdio().await?;
    Ok(())
}
