//! Wire envelope exchanged with the host frame.
//!
//! ```text
//! { "source": "typed-transport", "id": "<uuid>", "event"?: string,
//!   "request"?: any, "response"?: any, "error"?: string }
//! ```
//!
//! A request carries `event` and `request`; a response carries `response` or
//! `error` and is matched by `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol tag carried in every envelope.
pub const PROTOCOL_SOURCE: &str = "typed-transport";

/// Destination origin used when posting to the parent; the parent enforces its
/// own origin policy.
pub const WILDCARD_ORIGIN: &str = "*";

/// One message of the typed-transport protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Protocol tag, always [`PROTOCOL_SOURCE`] for our messages
    pub source: String,
    /// Correlation id
    pub id: String,
    /// Event name (requests only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Request payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    /// Response payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// Error message from the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageEnvelope {
    /// Build a request envelope.
    #[must_use]
    pub fn request(id: impl Into<String>, event: impl Into<String>, payload: Value) -> Self {
        Self {
            source: PROTOCOL_SOURCE.to_string(),
            id: id.into(),
            event: Some(event.into()),
            request: Some(payload),
            response: None,
            error: None,
        }
    }

    /// Build a successful response envelope.
    #[must_use]
    pub fn response(id: impl Into<String>, payload: Value) -> Self {
        Self {
            source: PROTOCOL_SOURCE.to_string(),
            id: id.into(),
            event: None,
            request: None,
            response: Some(payload),
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: PROTOCOL_SOURCE.to_string(),
            id: id.into(),
            event: None,
            request: None,
            response: None,
            error: Some(message.into()),
        }
    }

    /// Parse a raw message payload. Returns `None` for anything that is not an
    /// envelope of this protocol.
    #[must_use]
    pub fn parse(data: &Value) -> Option<Self> {
        let tagged = data.get("source").and_then(Value::as_str) == Some(PROTOCOL_SOURCE);
        if !tagged {
            return None;
        }
        Self::deserialize(data).ok()
    }

    /// Whether this envelope is a request rather than a response.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        self.event.is_some() && self.response.is_none() && self.error.is_none()
    }

    /// Outcome carried by a response envelope.
    ///
    /// `error` wins over `response`. A response without payload resolves to
    /// `null`. Requests carry no outcome.
    #[must_use]
    pub fn into_outcome(self) -> Option<Result<Value, String>> {
        if let Some(error) = self.error {
            return Some(Err(error));
        }
        if self.is_request() {
            return None;
        }
        Some(Ok(self.response.unwrap_or(Value::Null)))
    }

    /// Serialize into the JSON value posted across the frame boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload cannot be represented as JSON.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_without_empty_fields() {
        let envelope = MessageEnvelope::request("abc", "getTopLevelUrlData", json!({}));
        assert_eq!(
            envelope.to_value().unwrap(),
            json!({
                "source": "typed-transport",
                "id": "abc",
                "event": "getTopLevelUrlData",
                "request": {}
            })
        );
        assert!(envelope.is_request());
        assert_eq!(envelope.into_outcome(), None);
    }

    #[test]
    fn test_error_wins_over_response() {
        let data = json!({
            "source": "typed-transport",
            "id": "1",
            "response": {"ok": true},
            "error": "nope"
        });
        let envelope = MessageEnvelope::parse(&data).unwrap();
        assert_eq!(envelope.into_outcome(), Some(Err("nope".to_string())));
    }

    #[test]
    fn test_null_response_resolves_to_null() {
        let data = json!({"source": "typed-transport", "id": "1", "response": null});
        let envelope = MessageEnvelope::parse(&data).unwrap();
        assert_eq!(envelope.into_outcome(), Some(Ok(Value::Null)));
    }

    #[test]
    fn test_foreign_messages_are_not_envelopes() {
        assert!(MessageEnvelope::parse(&json!({"type": "resize", "height": 300})).is_none());
        assert!(MessageEnvelope::parse(&json!({"source": "other", "id": "1"})).is_none());
        assert!(MessageEnvelope::parse(&json!("typed-transport")).is_none());
        // Tagged but missing the id.
        assert!(MessageEnvelope::parse(&json!({"source": "typed-transport"})).is_none());
    }
}
