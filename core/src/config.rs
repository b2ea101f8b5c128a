//! Configuration for client construction.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api";

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_API_URL: &str = "SHOWTRACK_API_URL";
/// Environment variable naming the file the bearer token is persisted to.
pub const ENV_TOKEN_FILE: &str = "SHOWTRACK_TOKEN_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root; endpoint paths such as `/tvshows` are appended to it.
    pub base_url: String,
    /// Where the bearer token survives restarts. `None` keeps it in memory only.
    pub token_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_file: None,
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `SHOWTRACK_API_URL` and `SHOWTRACK_TOKEN_FILE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            config.base_url = url;
        }
        config.token_file = lookup(ENV_TOKEN_FILE)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        config
    }
}
