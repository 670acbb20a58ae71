// src/config.rs
use std::time::Duration;

pub const VISION_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const MAX_OUTPUT_TOKENS: u32 = 4096;
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Configuration collaborator consulted once per analyze call.
pub trait CredentialCheck: Send + Sync {
    fn has_api_credential(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub redis_url: String,
    pub bind_addr: String,
    pub request_timeout: Duration,
    pub cache_sweep_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            request_timeout: Duration::from_secs(60),
            cache_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            anthropic_api_key: lookup("ANTHROPIC_API_KEY")
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            anthropic_base_url: lookup("ANTHROPIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.anthropic_base_url),
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            request_timeout: secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            cache_sweep_interval: secs("CACHE_SWEEP_INTERVAL_SECS", defaults.cache_sweep_interval),
        }
    }
}

impl CredentialCheck for AppConfig {
    fn has_api_credential(&self) -> bool {
        self.anthropic_api_key.is_some()
    }
}
