use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;

use crate::gateway::GatewayError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(#[from] serde_json::Error),
    #[error("failed to decode image data: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait McpTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn call(&self, params: Value) -> Result<String, ToolError>;
}

/// Null or missing arguments read as an empty object.
pub fn parse_args<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
