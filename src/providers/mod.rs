//! Generative-model provider integrations

mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::conversation::{Message, Role};

pub use gemini::GeminiProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// One turn in the provider's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl From<&Message> for Content {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.clone(),
            parts: vec![Part {
                text: msg.content.clone(),
            }],
        }
    }
}

/// Anything that can turn a sequence of contents into a model response.
///
/// The response is handed back untyped; its shape differs between API
/// versions and is only interpreted by [`crate::relay::extract_text`].
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, model: &str, contents: &[Content]) -> Result<Value, ProviderError>;
}

/// Pick the generator for this process. `None` means no credential is
/// configured and chat requests must be refused.
pub fn from_config(config: &Config) -> Option<Arc<dyn ContentGenerator>> {
    let api_key = config.api_key.clone()?;
    Some(Arc::new(GeminiProvider::new(config.api_base.clone(), api_key)))
}
