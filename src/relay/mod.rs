//! Request normalization and response extraction for the relay
//!
//! The relay speaks `{ messages: [{ role, content }] }` to its clients and
//! `{ contents: [{ role, parts: [{ text }] }] }` to the provider. Replies go
//! the other way as a single flat string.

use serde_json::Value;
use thiserror::Error;

use crate::conversation::Message;
use crate::providers::Content;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("`messages` must be an array")]
    MessagesNotArray,

    #[error("Invalid message: {0}")]
    InvalidMessage(#[source] serde_json::Error),
}

/// Decode a relay request body into its messages.
pub fn parse_messages(body: &[u8]) -> Result<Vec<Message>, RelayError> {
    let mut request: Value = serde_json::from_slice(body).map_err(RelayError::InvalidJson)?;

    let messages = match request.get_mut("messages").map(Value::take) {
        Some(messages @ Value::Array(_)) => messages,
        _ => return Err(RelayError::MessagesNotArray),
    };

    serde_json::from_value(messages).map_err(RelayError::InvalidMessage)
}

/// Map each message onto a single-part provider content, keeping order.
pub fn to_contents(messages: &[Message]) -> Vec<Content> {
    messages.iter().map(Content::from).collect()
}

/// Pull the reply text out of a provider response.
///
/// Shapes are tried in order, the first one producing non-empty text wins:
///
/// 1. `response.candidates[0].content.parts[0].text` (single part)
/// 2. `candidates[0].content.parts[0].text` (single part)
/// 3. `response.candidates[0].content.parts[*].text` joined with `\n`
/// 4. `candidates[0].content.parts[*].text` joined with `\n`
///
/// When nothing matches the whole response is returned as JSON text so the
/// caller still gets something to look at.
pub fn extract_text(response: &Value) -> String {
    let wrapped = response.get("response");

    wrapped
        .and_then(single_part_text)
        .or_else(|| single_part_text(response))
        .or_else(|| wrapped.and_then(joined_parts_text))
        .or_else(|| joined_parts_text(response))
        .unwrap_or_else(|| response.to_string())
}

fn first_candidate_parts(root: &Value) -> Option<&Vec<Value>> {
    root.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()
}

fn single_part_text(root: &Value) -> Option<String> {
    match first_candidate_parts(root)?.as_slice() {
        [only] => only
            .get("text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn joined_parts_text(root: &Value) -> Option<String> {
    let joined = first_candidate_parts(root)?
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use serde_json::json;

    #[test]
    fn test_extract_single_part() {
        let response = json!({ "candidates": [{ "content": { "parts": [{ "text": "hi" }] } }] });
        assert_eq!(extract_text(&response), "hi");

        let wrapped = json!({ "response": response });
        assert_eq!(extract_text(&wrapped), "hi");
    }

    #[test]
    fn test_extract_joins_parts() {
        let response = json!({
            "response": { "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }] }
        });
        assert_eq!(extract_text(&response), "a\nb");

        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "inlineData": {} }, { "text": "" }, { "text": "c" }] } }]
        });
        assert_eq!(extract_text(&response), "a\nc");
    }

    #[test]
    fn test_extract_prefers_wrapped_shape() {
        let response = json!({
            "response": { "candidates": [{ "content": { "parts": [{ "text": "inner" }] } }] },
            "candidates": [{ "content": { "parts": [{ "text": "outer" }] } }]
        });
        assert_eq!(extract_text(&response), "inner");
    }

    #[test]
    fn test_extract_falls_back_to_json() {
        assert_eq!(extract_text(&json!({})), "{}");

        let empty = json!({ "candidates": [{ "content": { "parts": [{ "text": "" }] } }] });
        assert_eq!(extract_text(&empty), empty.to_string());

        assert_eq!(extract_text(&json!(null)), "null");
    }

    #[test]
    fn test_parse_messages() {
        let messages = parse_messages(
            br#"{"messages":[{"role":"user","content":"hi"},{"role":"tool","content":"x"}]}"#,
        )
        .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::user("hi"));
        assert_eq!(messages[1].role, Role::Other("tool".to_string()));
    }

    #[test]
    fn test_parse_messages_rejects_bad_shapes() {
        assert!(matches!(
            parse_messages(br#"{"messages":"not-an-array"}"#),
            Err(RelayError::MessagesNotArray)
        ));
        assert!(matches!(parse_messages(b"{}"), Err(RelayError::MessagesNotArray)));
        assert!(matches!(parse_messages(b"nope"), Err(RelayError::InvalidJson(_))));
        assert!(matches!(
            parse_messages(br#"{"messages":[{"role":"user"}]}"#),
            Err(RelayError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_to_contents_keeps_order() {
        let messages = vec![Message::model("first"), Message::user("second")];
        let contents = to_contents(&messages);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].role, Role::Model);
        assert_eq!(contents[0].parts[0].text, "first");
        assert_eq!(contents[1].parts[0].text, "second");
    }
}
