use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::gateway::{GatewayClient, GatewayError, GatewayReply, Money, RequestOptions};
use crate::mcp_gateway::tool::{McpTool, ToolError, parse_args};

pub const VIDEO_PATH: &str = "/v1/video/generations";
pub const VIDEO_FALLBACK_PATH: &str = "/v1/videos/generations";

#[derive(Debug, Deserialize)]
struct VideoArgs {
    model: String,
    prompt: String,
    image_url: Option<String>,
    duration: Option<Value>,
    aspect_ratio: Option<String>,
}

impl VideoArgs {
    fn into_body(self) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), Value::String(self.model));
        body.insert("prompt".into(), Value::String(self.prompt));
        if let Some(image_url) = self.image_url {
            body.insert("image_url".into(), Value::String(image_url));
        }
        if let Some(duration) = self.duration.filter(|d| !d.is_null()) {
            body.insert("duration".into(), duration);
        }
        if let Some(aspect_ratio) = self.aspect_ratio {
            body.insert("aspect_ratio".into(), Value::String(aspect_ratio));
        }
        Value::Object(body)
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoGeneration {
    #[serde(default)]
    pub data: Option<Vec<VideoDatum>>,
    #[serde(flatten)]
    pub money: Money,
}

#[derive(Debug, Deserialize)]
pub struct VideoDatum {
    #[serde(default)]
    pub url: Option<String>,
}

/// Posts to the primary path; when that does not answer with JSON the same
/// body goes to the pluralized path, whose body reads as `null` if it does
/// not parse.
pub async fn submit_video(gateway: &GatewayClient, body: Value) -> Result<Value, GatewayError> {
    let primary = gateway
        .send(VIDEO_PATH, RequestOptions::post(body.clone()))
        .await?;
    if primary.is_json() {
        return primary.json();
    }

    log::warn!(
        "{} answered with {:?}, retrying on {}",
        VIDEO_PATH,
        primary.content_type,
        VIDEO_FALLBACK_PATH
    );
    let fallback = gateway
        .send(VIDEO_FALLBACK_PATH, RequestOptions::post(body))
        .await?;
    Ok(fallback.json().unwrap_or_else(|e| {
        log::warn!("{} returned a non JSON body: {}", VIDEO_FALLBACK_PATH, e);
        Value::Null
    }))
}

pub fn render_video(response: Value) -> String {
    match GatewayReply::<VideoGeneration>::from_value(response.clone()) {
        Ok(GatewayReply::Declared(message)) => format!("Error: {}", message),
        Ok(GatewayReply::Success(generation)) => {
            let url = generation
                .data
                .as_ref()
                .and_then(|data| data.first())
                .and_then(|video| video.url.as_deref())
                .filter(|url| !url.is_empty());
            match url {
                Some(url) => match generation.money.footer() {
                    Some(footer) => format!("Video: {}\n\n{}", url, footer),
                    None => format!("Video: {}", url),
                },
                None => pending_line(&response),
            }
        }
        // 非预期结构，原样返回给调用方
        Err(_) => pending_line(&response),
    }
}

fn pending_line(response: &Value) -> String {
    format!("Video generation response: {}", response)
}

pub struct VideoTool {
    gateway: Arc<GatewayClient>,
}

impl VideoTool {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl McpTool for VideoTool {
    fn name(&self) -> &str {
        "nano_generate_video"
    }

    fn description(&self) -> &str {
        "Generate a video from a text prompt, optionally starting from an image. Long jobs may come back as a status response instead of a URL"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "model": { "type": "string", "description": "Video model id" },
                "prompt": { "type": "string", "description": "Description of the video" },
                "image_url": { "type": "string", "description": "Optional source image for image-to-video" },
                "duration": { "type": "number", "description": "Duration in seconds" },
                "aspect_ratio": { "type": "string", "description": "Aspect ratio, e.g. 16:9" }
            },
            "required": ["model", "prompt"]
        })
    }

    async fn call(&self, params: Value) -> Result<String, ToolError> {
        let args: VideoArgs = parse_args(params)?;
        let response = submit_video(&self.gateway, args.into_body()).await?;
        Ok(render_video(response))
    }
}
