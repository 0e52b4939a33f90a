use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::gateway::reply::{lenient, lenient_number};
use crate::gateway::{GatewayClient, GatewayReply, Money, RequestOptions};
use crate::mcp_gateway::tool::{McpTool, ToolError, parse_args};

pub const CHAT_PATH: &str = "/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct ChatArgs {
    model: String,
    prompt: String,
    system: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

impl<'a> ChatRequest<'a> {
    fn from_args(args: &'a ChatArgs) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = args.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &args.prompt,
        });
        Self {
            model: &args.model,
            messages,
            temperature: args.temperature,
            max_tokens: args.max_tokens,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletion {
    #[serde(default, deserialize_with = "lenient")]
    pub choices: Option<Vec<Choice>>,
    #[serde(default, deserialize_with = "lenient")]
    pub usage: Option<Usage>,
    #[serde(flatten)]
    pub money: Money,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "lenient_number")]
    pub prompt_tokens: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub completion_tokens: Option<f64>,
}

impl ChatCompletion {
    fn content(&self) -> Option<String> {
        let content = self.choices.as_ref()?.first()?.message.as_ref()?.content.as_ref()?;
        match content {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

pub fn render_chat(reply: GatewayReply<ChatCompletion>, model: &str) -> String {
    let completion = match reply {
        GatewayReply::Declared(message) => return format!("Error: {}", message),
        GatewayReply::Success(completion) => completion,
    };

    let content = completion
        .content()
        .unwrap_or_else(|| "No content returned".to_string());

    let mut footer = vec![format!("Model: {}", model)];
    if let Some(usage) = &completion.usage {
        if usage.prompt_tokens.is_some() || usage.completion_tokens.is_some() {
            let count = |n: Option<f64>| n.map_or_else(|| "?".to_string(), |n| n.to_string());
            footer.push(format!(
                "Tokens: {} prompt / {} completion",
                count(usage.prompt_tokens),
                count(usage.completion_tokens)
            ));
        }
    }
    if let Some(money) = completion.money.footer() {
        footer.push(money);
    }

    format!("{}\n\n---\n{}", content, footer.join(" | "))
}

pub struct ChatTool {
    gateway: Arc<GatewayClient>,
}

impl ChatTool {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl McpTool for ChatTool {
    fn name(&self) -> &str {
        "nano_chat"
    }

    fn description(&self) -> &str {
        "Send a prompt to a text model through the NanoGPT gateway and return its reply, with token usage, cost and remaining balance"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "model": { "type": "string", "description": "Model id, e.g. gpt-4o or claude-3-5-sonnet-20241022" },
                "prompt": { "type": "string", "description": "User message" },
                "system": { "type": "string", "description": "Optional system prompt" },
                "temperature": { "type": "number", "description": "Sampling temperature (0-2)" },
                "max_tokens": { "type": "number", "description": "Maximum tokens to generate" }
            },
            "required": ["model", "prompt"]
        })
    }

    async fn call(&self, params: Value) -> Result<String, ToolError> {
        let args: ChatArgs = parse_args(params)?;
        let body = serde_json::to_value(ChatRequest::from_args(&args))?;

        let response = self.gateway.request(CHAT_PATH, RequestOptions::post(body)).await?;
        Ok(render_chat(GatewayReply::from_value(response)?, &args.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: Value) -> String {
        render_chat(GatewayReply::from_value(value).unwrap(), "gpt-4o")
    }

    #[test]
    fn bare_reply_gets_model_only_footer() {
        let text = render(json!({ "choices": [{ "message": { "content": "hi" } }] }));
        assert_eq!(text, "hi\n\n---\nModel: gpt-4o");
    }

    #[test]
    fn declared_error_is_rendered_verbatim() {
        let text = render(json!({ "error": { "message": "Invalid API key" } }));
        assert_eq!(text, "Error: Invalid API key");
    }

    #[test]
    fn footer_lists_usage_cost_and_balance() {
        let text = render(json!({
            "choices": [{ "message": { "content": "answer" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 30 },
            "cost": 0.00042,
            "remainingBalance": 4.2
        }));
        assert_eq!(
            text,
            "answer\n\n---\nModel: gpt-4o | Tokens: 12 prompt / 30 completion | Cost: $0.0004 | Balance: $4.2000"
        );
    }

    #[test]
    fn missing_choices_fall_back() {
        assert!(render(json!({})).starts_with("No content returned\n"));
        assert!(render(json!({ "choices": [] })).starts_with("No content returned\n"));
        assert!(
            render(json!({ "choices": [{ "message": { "content": null } }] }))
                .starts_with("No content returned\n")
        );
    }

    #[test]
    fn request_puts_system_message_first() {
        let args: ChatArgs = parse_args(json!({
            "model": "m",
            "prompt": "p",
            "system": "s",
            "temperature": 0.2
        }))
        .unwrap();
        let body = serde_json::to_value(ChatRequest::from_args(&args)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "m",
                "messages": [
                    { "role": "system", "content": "s" },
                    { "role": "user", "content": "p" }
                ],
                "temperature": 0.2
            })
        );
    }

    #[test]
    fn odd_usage_shapes_keep_the_content() {
        let text = render(json!({
            "choices": [{ "message": { "content": "hi" } }],
            "usage": { "prompt_tokens": 12.0, "completion_tokens": "30" }
        }));
        assert_eq!(text, "hi\n\n---\nModel: gpt-4o | Tokens: 12 prompt / 30 completion");

        let text = render(json!({
            "choices": [{ "message": { "content": "hi" } }],
            "usage": "n/a",
            "cost": 0.5
        }));
        assert_eq!(text, "hi\n\n---\nModel: gpt-4o | Cost: $0.5000");

        let text = render(json!({ "choices": { "0": "x" } }));
        assert!(text.starts_with("No content returned\n"));
    }

    #[test]
    fn blank_system_prompt_is_omitted() {
        let args: ChatArgs =
            parse_args(json!({ "model": "m", "prompt": "p", "system": "" })).unwrap();
        let body = serde_json::to_value(ChatRequest::from_args(&args)).unwrap();
        assert_eq!(body["messages"], json!([{ "role": "user", "content": "p" }]));
    }

    #[test]
    fn prompt_is_required() {
        let err = parse_args::<ChatArgs>(json!({ "model": "m" })).unwrap_err();
        assert!(err.to_string().contains("prompt"));
    }
}
