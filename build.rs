use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    gateway: Gateway,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Gateway {
    base_url: String,
    api_key_env: String,
    base_url_env: String,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    // 应用信息，用于 MCP serverInfo
    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 网关配置
    println!("cargo:rustc-env=GATEWAY_BASE_URL={}", config.gateway.base_url);
    println!("cargo:rustc-env=GATEWAY_API_KEY_ENV={}", config.gateway.api_key_env);
    println!("cargo:rustc-env=GATEWAY_BASE_URL_ENV={}", config.gateway.base_url_env);
}
