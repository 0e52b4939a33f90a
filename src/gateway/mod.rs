pub mod reply;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;

use crate::config::Config;

pub use reply::{GatewayReply, Money};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid gateway URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid API key header value")]
    InvalidApiKey,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

/// One outbound call. Caller headers override the defaults.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }
}

/// Unparsed reply, kept for callers that look at the content type first.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub content_type: Option<String>,
    pub body: String,
}

impl RawReply {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }

    pub fn json(&self) -> Result<Value, GatewayError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

pub struct GatewayClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GatewayClient {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Absolute http(s) URLs pass through untouched; anything else is
    /// appended to the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, GatewayError> {
        let joined = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined).map_err(|source| GatewayError::InvalidUrl {
            url: joined,
            source,
        })
    }

    /// Sends the request and parses the body as JSON. HTTP status is not
    /// inspected.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, GatewayError> {
        self.send(path, options).await?.json()
    }

    pub async fn send(&self, path: &str, options: RequestOptions) -> Result<RawReply, GatewayError> {
        let url = self.resolve(path)?;
        let headers = self.headers(options.headers)?;

        log::info!("Gateway request: {} {}", options.method, url);

        let mut request = self.http.request(options.method, url).headers(headers);
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        log::debug!(
            "Gateway response: status={} content_type={:?} bytes={}",
            status,
            content_type,
            body.len()
        );

        Ok(RawReply { content_type, body })
    }

    fn headers(&self, overrides: HeaderMap) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| GatewayError::InvalidApiKey)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut current = None;
        for (name, value) in overrides {
            if let Some(name) = name {
                headers.remove(&name);
                current = Some(name);
            }
            if let Some(name) = &current {
                headers.append(name.clone(), value);
            }
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GatewayClient {
        let config = Config::with_credentials(base, "sk-test", std::env::temp_dir());
        GatewayClient::new(&config).unwrap()
    }

    #[test]
    fn resolves_relative_paths_against_base() {
        let gateway = client("https://nano-gpt.com/api/");
        let url = gateway.resolve("/v1/models?detailed=true").unwrap();
        assert_eq!(url.as_str(), "https://nano-gpt.com/api/v1/models?detailed=true");
    }

    #[test]
    fn absolute_urls_bypass_base() {
        let gateway = client("https://nano-gpt.com/api");
        let url = gateway.resolve("https://example.com/other").unwrap();
        assert_eq!(url.as_str(), "https://example.com/other");
    }

    #[test]
    fn caller_headers_override_defaults() {
        let gateway = client("https://nano-gpt.com/api");
        let mut overrides = HeaderMap::new();
        overrides.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        overrides.insert("x-extra", HeaderValue::from_static("1"));

        let headers = gateway.headers(overrides).unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
        assert_eq!(headers.get("x-extra").unwrap(), "1");
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn json_detection_uses_content_type() {
        let reply = RawReply {
            content_type: Some("application/json; charset=utf-8".into()),
            body: "{}".into(),
        };
        assert!(reply.is_json());

        let html = RawReply {
            content_type: Some("text/html".into()),
            body: "<html></html>".into(),
        };
        assert!(!html.is_json());
        assert!(html.json().is_err());

        let missing = RawReply {
            content_type: None,
            body: "{}".into(),
        };
        assert!(!missing.is_json());
    }
}
