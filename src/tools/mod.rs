pub mod balance;
pub mod chat;
pub mod image;
pub mod models;
pub mod video;

use std::sync::Arc;

use crate::config::Config;
use crate::gateway::GatewayClient;
use crate::mcp_gateway::tool::McpTool;

pub use balance::BalanceTool;
pub use chat::ChatTool;
pub use image::ImageTool;
pub use models::ListModelsTool;
pub use video::VideoTool;

/// The five gateway tools, in the order `tools/list` reports them.
pub fn gateway_tools(gateway: Arc<GatewayClient>, config: &Config) -> Vec<Box<dyn McpTool>> {
    vec![
        Box::new(ChatTool::new(gateway.clone())),
        Box::new(ImageTool::new(gateway.clone(), config.image_dir.clone())),
        Box::new(VideoTool::new(gateway.clone())),
        Box::new(ListModelsTool::new(gateway.clone())),
        Box::new(BalanceTool::new(gateway)),
    ]
}
