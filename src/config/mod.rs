//! Application configuration

pub mod client;

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use client::ClientConfig;

/// Environment variable pointing at an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "CHAT_RELAY_CONFIG";

/// Relay server configuration.
///
/// The provider credential never lives in the file itself; `api_key_env`
/// names the environment variable it is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Extra ports to try when `port` is already taken
    #[serde(default = "default_port_retries")]
    pub port_retries: u16,

    /// Model identifier sent with every provider call
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_port_retries() -> u16 {
    10
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_retries: default_port_retries(),
            model: default_model(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load from the file named by `CHAT_RELAY_CONFIG`, or from plain
    /// environment variables when it is unset.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => Ok(Self::from_env()),
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut config = Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            port_retries: env::var("PORT_RETRIES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port_retries),
            model: env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            api_base: env::var("GEMINI_API_BASE").unwrap_or(defaults.api_base),
            api_key_env: defaults.api_key_env,
            api_key: None,
        };
        config.resolve_api_key();
        config
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        if config.model.trim().is_empty() {
            return Err(ConfigError::Validation("model must not be empty".to_string()));
        }
        config.resolve_api_key();
        Ok(config)
    }

    /// Attach a credential directly, bypassing the environment.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn resolve_api_key(&mut self) {
        self.api_key = env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
