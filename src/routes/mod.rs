//! API routes

mod error;

use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::relay;
use crate::AppState;

pub use error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    model: String,
    has_key: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub result: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.config.model.clone(),
        has_key: state.generator.is_some(),
    })
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatResponse>, ApiError> {
    let generator = state
        .generator
        .clone()
        .ok_or_else(|| ApiError::missing_credential(&state.config.api_key_env))?;

    let messages = relay::parse_messages(&body)?;
    let contents = relay::to_contents(&messages);

    let response = generator.generate(&state.config.model, &contents).await?;
    let result = relay::extract_text(&response);

    tracing::debug!(turns = messages.len(), chars = result.len(), "chat relayed");

    Ok(Json(ChatResponse { result }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
}
