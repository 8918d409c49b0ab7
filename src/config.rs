use dotenvy::dotenv;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://open.tiktokapis.com";
pub const DEFAULT_AUTH_BASE_URL: &str = "https://www.tiktok.com";

#[derive(Debug, Clone)]
pub struct TikTokConfig {
    pub api: ApiConfig,
    pub oauth: OAuthAppConfig,
    pub poll: PollConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host for `/v2/...` endpoints, without a trailing slash.
    pub base_url: String,
    pub auth_base_url: String,
    pub request_timeout: Duration,
    /// Applies to video downloads and chunk PUTs, which move far more data.
    pub upload_timeout: Duration,
}

#[derive(Clone, Default)]
pub struct OAuthAppConfig {
    pub client_key: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for OAuthAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthAppConfig")
            .field("client_key", &crate::channels::tiktok::preview(&self.client_key))
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 30,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            oauth: OAuthAppConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

impl TikTokConfig {
    /// Reads `.env` (if present) and the `TIKTOK_*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        dotenv().ok();

        let api_defaults = ApiConfig::default();
        let poll_defaults = PollConfig::default();

        Ok(Self {
            api: ApiConfig {
                base_url: env_or("TIKTOK_API_BASE_URL", &api_defaults.base_url),
                auth_base_url: env_or("TIKTOK_AUTH_BASE_URL", &api_defaults.auth_base_url),
                request_timeout: env_secs(
                    "TIKTOK_HTTP_TIMEOUT_SECS",
                    api_defaults.request_timeout,
                )?,
                upload_timeout: env_secs(
                    "TIKTOK_UPLOAD_TIMEOUT_SECS",
                    api_defaults.upload_timeout,
                )?,
            },
            oauth: OAuthAppConfig {
                client_key: env::var("TIKTOK_CLIENT_KEY")?,
                client_secret: env::var("TIKTOK_CLIENT_SECRET")?,
                redirect_uri: env::var("TIKTOK_REDIRECT_URI").unwrap_or_default(),
            },
            poll: PollConfig {
                interval: env_secs("TIKTOK_POLL_INTERVAL_SECS", poll_defaults.interval)?,
                max_attempts: match env::var("TIKTOK_POLL_MAX_ATTEMPTS") {
                    Ok(v) => v.trim().parse()?,
                    Err(_) => poll_defaults.max_attempts,
                },
            },
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll = PollConfig {
            interval,
            max_attempts,
        };
        self
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: Duration) -> anyhow::Result<Duration> {
    match env::var(key) {
        Ok(v) => Ok(Duration::from_secs(v.trim().parse()?)),
        Err(_) => Ok(default),
    }
}
