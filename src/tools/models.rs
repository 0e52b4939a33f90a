use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;

use crate::gateway::reply::{display_value, is_truthy, lenient, lenient_number, number_of};
use crate::gateway::{GatewayClient, GatewayReply, RequestOptions};
use crate::mcp_gateway::tool::{McpTool, ToolError, parse_args};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
}

impl ModelType {
    pub fn path(self) -> &'static str {
        match self {
            ModelType::Text => "/v1/models?detailed=true",
            ModelType::Image => "/v1/image-models?detailed=true",
            ModelType::Video => "/v1/video-models?detailed=true",
            ModelType::Audio => "/v1/audio-models?detailed=true",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Text => "text",
            ModelType::Image => "image",
            ModelType::Video => "video",
            ModelType::Audio => "audio",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default, rename = "type")]
    kind: ModelType,
    search: Option<String>,
}

/// Listings come either wrapped as `{ "data": [...] }` or as a bare array.
/// Entries are read one by one, so an unreadable entry is skipped on its own.
#[derive(Debug, Default, Deserialize)]
#[serde(from = "Value")]
pub struct ModelCatalog {
    pub models: Vec<ModelDescriptor>,
}

impl From<Value> for ModelCatalog {
    fn from(value: Value) -> Self {
        let entries = match value {
            Value::Array(entries) => entries,
            Value::Object(mut listing) => match listing.remove("data") {
                Some(Value::Array(entries)) => entries,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        let models = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(model) => Some(model),
                Err(err) => {
                    log::warn!("Skipping unreadable model entry: {}", err);
                    None
                }
            })
            .collect();
        Self { models }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDescriptor {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, alias = "ownedBy", deserialize_with = "lenient")]
    pub owned_by: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub pricing: Option<Pricing>,
    #[serde(default, deserialize_with = "lenient")]
    pub capabilities: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pricing {
    #[serde(default, deserialize_with = "lenient_number")]
    pub prompt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub completion: Option<f64>,
    #[serde(default, alias = "perImage", deserialize_with = "lenient")]
    pub per_image: Option<Map<String, Value>>,
    #[serde(default, alias = "perDuration", deserialize_with = "lenient")]
    pub per_duration: Option<Map<String, Value>>,
}

impl ModelDescriptor {
    fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    fn matches(&self, needle: &str) -> bool {
        let contains = |field: &str| field.to_lowercase().contains(needle);
        contains(self.id())
            || self.name.as_deref().is_some_and(contains)
            || self.owned_by.as_deref().is_some_and(contains)
    }

    fn text_line(&self) -> String {
        let mut line = format!("- {}", self.id());
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            line.push_str(&format!(": {}", name));
        }
        if let Some(pricing) = &self.pricing {
            if let Some(prompt) = pricing.prompt {
                let completion = pricing
                    .completion
                    .map_or_else(|| "?".to_string(), |c| c.to_string());
                line.push_str(&format!(" (${}/${} per M tokens)", prompt, completion));
            }
        }
        line
    }

    fn media_line(&self) -> String {
        let mut line = format!("- {}: {}", self.id(), self.name.as_deref().unwrap_or(""));

        let unit_price = self.pricing.as_ref().and_then(|p| {
            p.per_image
                .as_ref()
                .or(p.per_duration.as_ref())
                .and_then(|prices| prices.iter().next())
        });
        if let Some((unit, price)) = unit_price {
            let price = match number_of(price) {
                Some(n) => format!("${}", n),
                None => display_value(price),
            };
            line.push_str(&format!(" ({}: {})", unit, price));
        }

        let capabilities: Vec<&str> = self
            .capabilities
            .iter()
            .flatten()
            .filter(|(_, enabled)| is_truthy(enabled))
            .map(|(name, _)| name.as_str())
            .collect();
        if !capabilities.is_empty() {
            line.push_str(&format!(" [{}]", capabilities.join(", ")));
        }
        line
    }
}

pub fn render_models(
    reply: GatewayReply<ModelCatalog>,
    kind: ModelType,
    search: Option<&str>,
) -> String {
    let catalog = match reply {
        GatewayReply::Declared(message) => return format!("Error: {}", message),
        GatewayReply::Success(catalog) => catalog,
    };

    let search = search.filter(|s| !s.is_empty());
    let needle = search.map(str::to_lowercase);
    let lines: Vec<String> = catalog
        .models
        .into_iter()
        .filter(|model| needle.as_deref().is_none_or(|n| model.matches(n)))
        .map(|model| match kind {
            ModelType::Text => model.text_line(),
            _ => model.media_line(),
        })
        .collect();

    if lines.is_empty() {
        return match search {
            Some(term) => format!("No {} models found matching \"{}\"", kind, term),
            None => format!("No {} models found", kind),
        };
    }
    lines.join("\n")
}

pub struct ListModelsTool {
    gateway: Arc<GatewayClient>,
}

impl ListModelsTool {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl McpTool for ListModelsTool {
    fn name(&self) -> &str {
        "nano_list_models"
    }

    fn description(&self) -> &str {
        "List models available on the NanoGPT gateway with pricing, optionally filtered by type and a search term"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "enum": ["text", "image", "video", "audio"],
                    "description": "Model family (default: text)"
                },
                "search": { "type": "string", "description": "Case-insensitive filter on id, name or owner" }
            }
        })
    }

    async fn call(&self, params: Value) -> Result<String, ToolError> {
        let args: ListArgs = parse_args(params)?;
        let response = self
            .gateway
            .request(args.kind.path(), RequestOptions::get())
            .await?;
        Ok(render_models(
            GatewayReply::from_value(response)?,
            args.kind,
            args.search.as_deref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_catalog() -> Value {
        json!({
            "object": "list",
            "data": [
                { "id": "gpt-4o", "name": "GPT-4o", "owned_by": "openai", "pricing": { "prompt": 2.5, "completion": 10 } },
                { "id": "claude-3-5-sonnet", "name": "Claude 3.5 Sonnet", "owned_by": "anthropic" },
                { "id": "o1-mini", "name": "o1 mini", "owned_by": "OpenAI-GPT" },
                { "id": "chatgpt-4o-latest" }
            ]
        })
    }

    fn render(value: Value, kind: ModelType, search: Option<&str>) -> String {
        render_models(GatewayReply::from_value(value).unwrap(), kind, search)
    }

    #[test]
    fn search_matches_id_name_or_owner_in_order() {
        let text = render(text_catalog(), ModelType::Text, Some("GPT"));
        assert_eq!(
            text,
            "- gpt-4o: GPT-4o ($2.5/$10 per M tokens)\n- o1-mini: o1 mini\n- chatgpt-4o-latest"
        );
    }

    #[test]
    fn no_matches_names_type_and_term() {
        assert_eq!(
            render(text_catalog(), ModelType::Text, Some("llama")),
            "No text models found matching \"llama\""
        );
        assert_eq!(
            render(json!({ "data": [] }), ModelType::Audio, None),
            "No audio models found"
        );
    }

    #[test]
    fn media_lines_show_first_unit_price_and_truthy_capabilities() {
        let catalog = json!([
            {
                "id": "flux-pro",
                "name": "FLUX Pro",
                "pricing": { "per_image": { "1024x1024": 0.05, "512x512": 0.02 } },
                "capabilities": { "text_to_image": true, "image_to_image": false, "inpainting": 1 }
            },
            { "id": "kling", "pricing": { "per_duration": { "5s": "0.30" } } }
        ]);
        let image = render(catalog.clone(), ModelType::Image, None);
        assert_eq!(
            image,
            "- flux-pro: FLUX Pro (1024x1024: $0.05) [text_to_image, inpainting]\n- kling:  (5s: $0.3)"
        );
    }

    #[test]
    fn odd_entries_do_not_sink_the_listing() {
        let catalog = json!({
            "data": [
                { "id": "gpt-4o" },
                { "id": "odd", "capabilities": ["vision"], "pricing": "free" },
                "not-a-model",
                { "id": 42, "name": "Numbered", "pricing": { "per_image": [0.1] } }
            ]
        });
        assert_eq!(
            render(catalog, ModelType::Image, None),
            "- gpt-4o: \n- odd: \n- : Numbered"
        );
    }

    #[test]
    fn listing_without_data_has_no_models() {
        assert_eq!(
            render(json!({ "object": "list" }), ModelType::Text, None),
            "No text models found"
        );
        assert_eq!(
            render(json!({ "data": null }), ModelType::Video, Some("veo")),
            "No video models found matching \"veo\""
        );
    }

    #[test]
    fn search_term_is_used_as_given() {
        let catalog = json!([{ "id": "gpt-4o" }, { "id": "x", "name": "GPT 4 turbo" }]);
        assert_eq!(
            render(catalog.clone(), ModelType::Text, Some("gpt ")),
            "- x: GPT 4 turbo"
        );
        assert_eq!(
            render(catalog, ModelType::Text, Some("")),
            "- gpt-4o\n- x: GPT 4 turbo"
        );
    }

    #[test]
    fn declared_error_short_circuits() {
        assert_eq!(
            render(json!({ "error": "unauthorized" }), ModelType::Video, None),
            "Error: unauthorized"
        );
    }

    #[test]
    fn type_selects_endpoint() {
        let args: ListArgs = parse_args(json!({})).unwrap();
        assert_eq!(args.kind, ModelType::Text);
        assert_eq!(args.kind.path(), "/v1/models?detailed=true");
        assert_eq!(ModelType::Video.path(), "/v1/video-models?detailed=true");
        assert!(parse_args::<ListArgs>(json!({ "type": "3d" })).is_err());
    }
}
