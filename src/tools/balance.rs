use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::gateway::reply::display_value;
use crate::gateway::{GatewayClient, GatewayReply, RequestOptions};
use crate::mcp_gateway::tool::{McpTool, ToolError};

pub const BALANCE_PATH: &str = "/check-balance";

/// `balance`, then `credits`, then the whole response.
pub fn render_balance(reply: GatewayReply<Value>) -> String {
    let response = match reply {
        GatewayReply::Declared(message) => return format!("Error: {}", message),
        GatewayReply::Success(response) => response,
    };

    let value = ["balance", "credits"]
        .iter()
        .find_map(|field| response.get(*field).filter(|v| !v.is_null()))
        .unwrap_or(&response);
    format!("Balance: ${}", display_value(value))
}

pub struct BalanceTool {
    gateway: Arc<GatewayClient>,
}

impl BalanceTool {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl McpTool for BalanceTool {
    fn name(&self) -> &str {
        "nano_check_balance"
    }

    fn description(&self) -> &str {
        "Check the remaining account balance on the NanoGPT gateway"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _params: Value) -> Result<String, ToolError> {
        let response = self
            .gateway
            .request(BALANCE_PATH, RequestOptions::post(json!({})))
            .await?;
        Ok(render_balance(GatewayReply::from_value(response)?))
    }
}
