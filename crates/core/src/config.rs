use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

static DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
static ENV_BASE_URL: &str = "TDO_API_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the remote todo service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Url,
    timeout: Duration,
}

impl ClientConfig {
    /// Construct [`ClientConfig`] by resolving the service URL from the
    /// provided override, the environment, and the built-in default,
    /// in that order.
    pub fn discover(base_url_override: Option<String>) -> Result<Self> {
        let raw = base_url_override
            .or_else(|| env::var(ENV_BASE_URL).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::from_base_url(&raw)
    }

    /// Construct [`ClientConfig`] directly from a base URL string.
    pub fn from_base_url(raw: &str) -> Result<Self> {
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .with_context(|| format!("Invalid service URL '{raw}'"))?;
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_default() {
        let config = ClientConfig::discover(Some("http://tasks.example.com/api".into()))
            .expect("valid override");
        assert_eq!(
            config.base_url().as_str(),
            "http://tasks.example.com/api"
        );
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = ClientConfig::from_base_url("http://localhost:9000/api/").expect("valid url");
        assert_eq!(config.base_url().as_str(), "http://localhost:9000/api");
    }

    #[test]
    fn garbage_url_is_rejected() {
        assert!(ClientConfig::from_base_url("not a url").is_err());
    }
}
