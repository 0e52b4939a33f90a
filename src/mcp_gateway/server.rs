use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::protocol::{
    CallToolParams, INVALID_PARAMS, JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse,
    MCP_PROTOCOL_VERSION, METHOD_NOT_FOUND, RpcError, ToolDescriptor, ToolResult,
};
use super::tool::McpTool;

pub struct McpServer {
    name: String,
    version: String,
    // 保持注册顺序，tools/list 按此顺序输出
    tools: Vec<Box<dyn McpTool>>,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools: Vec::new(),
        }
    }

    /// Registering a name twice replaces the earlier tool.
    pub fn register_tool(&mut self, tool: Box<dyn McpTool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Always produces a result. Faults become `Error: ...` text and unknown
    /// names become `Unknown tool: ...`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolResult {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            log::warn!("Unknown tool requested: {}", name);
            return ToolResult::text(format!("Unknown tool: {}", name));
        };

        log::info!("Calling tool: {}", name);
        match tool.call(arguments).await {
            Ok(text) => ToolResult::text(text),
            Err(err) => {
                log::error!("Tool {} failed: {}", name, err);
                ToolResult::text(format!("Error: {}", err))
            }
        }
    }

    /// Handles one JSON-RPC line. Returns `None` for notifications and for
    /// anything that is not JSON-RPC 2.0.
    pub async fn handle_message(&self, payload: &str) -> Option<String> {
        let req: JsonRpcRequest = match serde_json::from_str(payload) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Ignoring non JSON-RPC message: {}", e);
                return None;
            }
        };

        if req.jsonrpc != JSONRPC_VERSION {
            log::warn!("Ignoring message with jsonrpc version {}", req.jsonrpc);
            return None;
        }

        // 按照 JSON-RPC 2.0 规范，通知消息（没有 id 字段）不需要响应
        if req.id.is_none() || req.method.starts_with("notifications") {
            log::info!("MCP notification received (no response needed): {}", req.method);
            return None;
        }

        let result = match req.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": { "name": self.name, "version": self.version }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.list_tools() })),
            "tools/call" => self.handle_tool_call(req.params).await,
            _ => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", req.method),
            )),
        };

        let response = match result {
            Ok(res) => JsonRpcResponse::success(req.id, res),
            Err(err) => JsonRpcResponse::failure(req.id, err),
        };

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                log::error!("Failed to serialize MCP response: {}", e);
                None
            }
        }
    }

    async fn handle_tool_call(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::new(INVALID_PARAMS, "Missing parameters"))?;
        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid tool call: {}", e)))?;

        Ok(self.call_tool(&params.name, params.arguments).await.to_value())
    }

    /// Line-delimited JSON-RPC over stdin/stdout.
    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Processes one line at a time until the reader hits EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(response) = self.handle_message(line).await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        log::info!("MCP input closed, stopping");
        Ok(())
    }
}
