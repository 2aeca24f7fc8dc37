//! Router assembly and listener binding

use std::io::ErrorKind;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::{routes, AppState};

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `host:port`, moving on to the next port while the current one is
/// taken, at most `port_retries` times.
pub async fn bind(config: &Config) -> anyhow::Result<TcpListener> {
    let mut port = config.port;
    let mut attempts_left = config.port_retries;

    loop {
        match TcpListener::bind((config.host.as_str(), port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse && attempts_left > 0 => {
                let next = port
                    .checked_add(1)
                    .ok_or_else(|| anyhow::anyhow!("no ports left after {}", port))?;
                tracing::warn!("Port {} is in use, trying {}", port, next);
                port = next;
                attempts_left -= 1;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "failed to bind {}:{}",
                    config.host, port
                )))
            }
        }
    }
}
