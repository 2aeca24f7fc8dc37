//! Relay client: transport plus a single-session chat front end
//!
//! `Transport` is the only writer of model turns. `ChatSession` wraps one
//! conversation and refuses new input while an exchange is outstanding, so
//! a session never has more than one request in flight.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::conversation::{Conversation, Message};

/// Failures of a single exchange. `Display` is the text shown to the user.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error")]
    Network(#[source] reqwest::Error),

    #[error("Failed to get response from server.")]
    InvalidBody(#[source] serde_json::Error),

    #[error("{0}")]
    Relay(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Sorry, no response received.")]
    EmptyReply,
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct RelayReply {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct Transport {
    client: Client,
    endpoint: String,
}

impl Transport {
    /// `relay_url` is the relay's base URL, e.g. `http://127.0.0.1:3000`.
    pub fn new(relay_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/api/chat", relay_url.trim_end_matches('/')),
        }
    }

    /// Send the whole conversation and record the reply.
    ///
    /// On success exactly one model turn is appended; on any error the
    /// conversation is left untouched.
    pub async fn send(&self, conversation: &mut Conversation) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RelayRequest {
                messages: conversation.messages(),
            })
            .send()
            .await
            .map_err(TransportError::Network)?;

        let status = response.status();
        let body = response.bytes().await.map_err(TransportError::Network)?;
        let reply: RelayReply = serde_json::from_slice(&body).map_err(TransportError::InvalidBody)?;

        if !status.is_success() {
            return Err(match reply.error.filter(|e| !e.is_empty()) {
                Some(message) => TransportError::Relay(message),
                None => TransportError::Status(status.as_u16()),
            });
        }

        let text = reply
            .result
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or(TransportError::EmptyReply)?;

        conversation.append_model(text.clone());
        Ok(text)
    }
}

/// Outcome of one user submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input; nothing happened.
    Ignored,
    /// Another exchange is still running.
    Busy,
    Reply(String),
    /// The exchange failed; holds the message to show.
    Failed(String),
}

pub struct ChatSession {
    transport: Transport,
    conversation: Mutex<Conversation>,
}

impl ChatSession {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            conversation: Mutex::new(Conversation::new()),
        }
    }

    pub async fn submit(&self, text: &str) -> Submission {
        if text.trim().is_empty() {
            return Submission::Ignored;
        }

        let Ok(mut conversation) = self.conversation.try_lock() else {
            return Submission::Busy;
        };

        conversation.append_user(text);
        match self.transport.send(&mut conversation).await {
            Ok(reply) => Submission::Reply(reply),
            Err(e) => {
                tracing::warn!(error = ?e, "exchange failed");
                Submission::Failed(e.to_string())
            }
        }
    }

    /// Copy of the conversation so far. Waits for any running exchange.
    pub async fn snapshot(&self) -> Conversation {
        self.conversation.lock().await.clone()
    }
}
