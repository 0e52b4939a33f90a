pub mod protocol;
pub mod server;
pub mod tool;

pub use protocol::{ToolDescriptor, ToolResult};
pub use server::McpServer;
pub use tool::{McpTool, ToolError};

use std::sync::Arc;

use crate::config::Config;
use crate::gateway::{GatewayClient, GatewayError};
use crate::tools;

pub fn init_mcp_gateway(config: &Config) -> Result<McpServer, GatewayError> {
    let gateway = Arc::new(GatewayClient::new(config)?);
    let mut server = McpServer::new(config.app_name, config.app_version);
    for tool in tools::gateway_tools(gateway, config) {
        log::info!("Registered MCP Tool: {}", tool.name());
        server.register_tool(tool);
    }
    Ok(server)
}
