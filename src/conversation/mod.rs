//! Conversation types and session-scoped history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::render;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// Who authored a turn.
///
/// Labels other than `user` and `model` are kept verbatim so the relay can
/// forward them untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Model,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::Other(label) => label,
        }
    }
}

impl From<String> for Role {
    fn from(label: String) -> Self {
        match label.as_str() {
            "user" => Role::User,
            "model" => Role::Model,
            _ => Role::Other(label),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

/// Ordered history of one chat session. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Append a user turn. Blank input is ignored and yields `None`.
    pub fn append_user(&mut self, text: &str) -> Option<&[Message]> {
        if text.trim().is_empty() {
            return None;
        }
        self.messages.push(Message::user(text));
        Some(&self.messages)
    }

    /// Only the transport records model turns.
    pub(crate) fn append_model(&mut self, content: impl Into<String>) {
        self.messages.push(Message::model(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Render the whole transcript as an HTML fragment.
    pub fn to_html(&self) -> String {
        self.messages
            .iter()
            .map(|msg| {
                let is_user = msg.role == Role::User;
                format!(
                    "<div class=\"message {}\">{}</div>",
                    render::escape_html(msg.role.as_str()),
                    render::render(&msg.content, is_user)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
