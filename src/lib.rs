//! Chat relay
//!
//! A small chat front end backed by a generative-language API. The relay
//! accepts a whole conversation, forwards it to the provider and returns
//! the reply as plain text; the client side keeps the history for one
//! session and renders replies through a safe markdown subset.

use std::sync::Arc;

pub mod client;
pub mod config;
pub mod conversation;
pub mod providers;
pub mod relay;
pub mod render;
pub mod routes;
pub mod server;

use config::Config;
use providers::ContentGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when no provider credential is configured
    pub generator: Option<Arc<dyn ContentGenerator>>,
}

impl AppState {
    pub fn new(config: Config, generator: Option<Arc<dyn ContentGenerator>>) -> Self {
        Self {
            config: Arc::new(config),
            generator,
        }
    }

    /// Build state with the provider selected from `config`.
    pub fn from_config(config: Config) -> Self {
        let generator = providers::from_config(&config);
        Self::new(config, generator)
    }
}
