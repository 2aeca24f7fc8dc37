//! Terminal client configuration
//!
//! Read from `CHAT_RELAY_URL` / `CHAT_TRANSCRIPT`, or from a TOML file:
//!
//! ```toml
//! relay_url = "http://127.0.0.1:3000"
//! transcript = "chat.html"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use super::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the relay, without the `/api/chat` suffix
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    /// Where to write the rendered HTML transcript on exit
    #[serde(default)]
    pub transcript: Option<PathBuf>,
}

fn default_relay_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            transcript: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            relay_url: env::var("CHAT_RELAY_URL").unwrap_or_else(|_| default_relay_url()),
            transcript: env::var("CHAT_TRANSCRIPT").ok().map(PathBuf::from),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        if !config.relay_url.starts_with("http://") && !config.relay_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "relay_url must be an http(s) URL, got {}",
                config.relay_url
            )));
        }
        Ok(config)
    }
}
