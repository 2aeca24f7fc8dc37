//! Chat relay server
//!
//! Accepts `{ messages }` on `POST /api/chat`, forwards the conversation to
//! the configured provider and answers with `{ result }`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_relay::config::Config;
use chat_relay::{server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    if !config.has_api_key() {
        tracing::warn!(
            "{} is not set; chat requests will be refused until it is",
            config.api_key_env
        );
    }

    let listener = server::bind(&config).await?;
    let addr = listener.local_addr()?;
    tracing::info!("Relay for model {} running at http://{}", config.model, addr);

    let app = server::app(AppState::from_config(config));
    axum::serve(listener, app).await?;

    Ok(())
}
