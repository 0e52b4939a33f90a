use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::gateway::reply::lenient;
use crate::gateway::{GatewayClient, GatewayReply, Money, RequestOptions};
use crate::mcp_gateway::tool::{McpTool, ToolError, parse_args};

pub const IMAGE_PATH: &str = "/v1/images/generations";

// "/9j/" 是 JPEG 文件头 FF D8 FF 的 base64 编码
const JPEG_BASE64_MAGIC: &str = "/9j/";

fn default_size() -> String {
    "1024x1024".to_string()
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ImageArgs {
    model: String,
    prompt: String,
    #[serde(default = "default_size")]
    size: String,
    #[serde(default = "default_count")]
    n: u32,
}

#[derive(Debug, Deserialize)]
pub struct ImageGeneration {
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<Vec<Value>>,
    #[serde(flatten)]
    pub money: Money,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageDatum {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub b64_json: Option<String>,
}

/// Drops a `data:image/...;base64,` prefix when the gateway sends one.
fn strip_data_url(payload: &str) -> &str {
    match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    }
}

pub fn image_extension(payload: &str) -> &'static str {
    if strip_data_url(payload).starts_with(JPEG_BASE64_MAGIC) {
        "jpg"
    } else {
        "png"
    }
}

/// Decodes and writes one image, returning the file path.
pub async fn save_image(dir: &Path, index: usize, payload: &str) -> Result<PathBuf, ToolError> {
    let encoded = strip_data_url(payload.trim());
    let bytes = STANDARD.decode(encoded)?;

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let path = dir.join(format!(
        "nano-image-{}-{}.{}",
        millis,
        index,
        image_extension(encoded)
    ));

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ToolError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| ToolError::Io {
            path: path.clone(),
            source,
        })?;

    log::info!("Saved generated image ({} bytes) to {}", bytes.len(), path.display());
    Ok(path)
}

pub async fn render_images(reply: GatewayReply<ImageGeneration>, dir: &Path) -> String {
    let generation = match reply {
        GatewayReply::Declared(message) => return format!("Error: {}", message),
        GatewayReply::Success(generation) => generation,
    };

    let images = generation.data.unwrap_or_default();
    let mut lines = Vec::with_capacity(images.len());
    for (index, entry) in images.into_iter().enumerate() {
        let k = index + 1;
        let image: ImageDatum = serde_json::from_value(entry).unwrap_or_default();
        let url = image.url.as_deref().filter(|u| !u.is_empty());
        let b64 = image.b64_json.as_deref().filter(|b| !b.is_empty());
        let line = match (url, b64) {
            (Some(url), _) => format!("Image {}: {}", k, url),
            (None, Some(b64)) => match save_image(dir, k, b64).await {
                Ok(path) => format!("Image {}: saved to {}", k, path.display()),
                Err(err) => {
                    log::warn!("Image {} could not be saved: {}", k, err);
                    format!("Image {}: failed to save: {}", k, err)
                }
            },
            (None, None) => format!("Image {}: no data returned", k),
        };
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push("No images returned".to_string());
    }

    let mut text = lines.join("\n");
    if let Some(footer) = generation.money.footer() {
        text.push_str("\n\n");
        text.push_str(&footer);
    }
    text
}

pub struct ImageTool {
    gateway: Arc<GatewayClient>,
    image_dir: PathBuf,
}

impl ImageTool {
    pub fn new(gateway: Arc<GatewayClient>, image_dir: PathBuf) -> Self {
        Self { gateway, image_dir }
    }
}

#[async_trait]
impl McpTool for ImageTool {
    fn name(&self) -> &str {
        "nano_generate_image"
    }

    fn description(&self) -> &str {
        "Generate images from a text prompt. Returns image URLs, or local file paths when the gateway answers with base64 data"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "model": { "type": "string", "description": "Image model id, e.g. dall-e-3 or flux-pro" },
                "prompt": { "type": "string", "description": "Description of the image" },
                "size": { "type": "string", "description": "Image size (default: 1024x1024)" },
                "n": { "type": "number", "description": "Number of images (default: 1)" }
            },
            "required": ["model", "prompt"]
        })
    }

    async fn call(&self, params: Value) -> Result<String, ToolError> {
        let args: ImageArgs = parse_args(params)?;
        let body = json!({
            "model": args.model,
            "prompt": args.prompt,
            "n": args.n,
            "size": args.size,
            "response_format": "url"
        });

        let response = self.gateway.request(IMAGE_PATH, RequestOptions::post(body)).await?;
        Ok(render_images(GatewayReply::from_value(response)?, &self.image_dir).await)
    }
}
