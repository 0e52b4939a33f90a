use std::env;
use std::path::PathBuf;

/// Env var that redirects base64 image output away from the OS temp dir.
pub const IMAGE_DIR_ENV: &str = "NANOGPT_IMAGE_DIR";

#[derive(Debug, Clone)]
pub struct Config {
    // 应用信息（静态部分，编译时从 config.toml 读取）
    pub app_name: &'static str,
    pub app_version: &'static str,

    // 网关配置
    pub base_url: String,
    pub api_key: String,

    // base64 图片落盘目录
    pub image_dir: PathBuf,
}

impl Config {
    /// 编译时的默认值 + 运行时环境变量
    ///
    /// A missing API key is not an error here: the gateway rejects the
    /// request and the caller sees that as a normal error result.
    pub fn new() -> Self {
        // .env 文件是可选的
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }

        let api_key = match env::var(env!("GATEWAY_API_KEY_ENV")) {
            Ok(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => {
                log::warn!(
                    "{} is not set, upstream requests will fail authentication",
                    env!("GATEWAY_API_KEY_ENV")
                );
                String::new()
            }
        };

        let base_url = env::var(env!("GATEWAY_BASE_URL_ENV"))
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| env!("GATEWAY_BASE_URL").to_string());

        let image_dir = env::var_os(IMAGE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        Self::with_credentials(base_url, api_key, image_dir)
    }

    pub fn with_credentials(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),
            base_url: base_url.into(),
            api_key: api_key.into(),
            image_dir: image_dir.into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
