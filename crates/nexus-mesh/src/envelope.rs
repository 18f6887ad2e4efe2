//! Wire envelope exchanged on the bus
//!
//! An [`Envelope`] serializes to a flat JSON object:
//!
//! ```json
//! {"sender_id": "orchestrator", "message_type": "tool_command", "payload": {...}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{MeshError, MeshResult};

/// Opaque structured payload carried by an envelope
pub type Payload = Map<String, Value>;

/// Payload key carrying the coordinator-side correlation id
pub const REQUEST_ID_KEY: &str = "request_id";

/// Payload key used for error descriptions
pub const ERROR_KEY: &str = "error";

/// Kind of message an envelope carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Coordinator asks an agent to run a tool
    ToolCommand,
    /// Agent reports a completed tool invocation
    Result,
    /// Agent reports a failed command
    Error,
    /// Informational status announcement
    StatusUpdate,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::ToolCommand => "tool_command",
            MessageType::Result => "result",
            MessageType::Error => "error",
            MessageType::StatusUpdate => "status_update",
        }
    }

    /// Whether this is a reply to an earlier command
    pub fn is_reply(&self) -> bool {
        matches!(self, MessageType::Result | MessageType::Error)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Who published the envelope
    pub sender_id: String,
    /// What the payload means
    pub message_type: MessageType,
    /// Message body
    pub payload: Payload,
}

impl Envelope {
    pub fn new(
        sender_id: impl Into<String>,
        message_type: MessageType,
        payload: Payload,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            message_type,
            payload,
        }
    }

    pub fn tool_command(sender_id: impl Into<String>, payload: Payload) -> Self {
        Self::new(sender_id, MessageType::ToolCommand, payload)
    }

    pub fn result(sender_id: impl Into<String>, payload: Payload) -> Self {
        Self::new(sender_id, MessageType::Result, payload)
    }

    /// Error reply whose payload is `{"error": message}`
    pub fn error(sender_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut payload = Payload::new();
        payload.insert(ERROR_KEY.to_string(), Value::String(message.into()));
        Self::new(sender_id, MessageType::Error, payload)
    }

    pub fn status_update(sender_id: impl Into<String>, payload: Payload) -> Self {
        Self::new(sender_id, MessageType::StatusUpdate, payload)
    }

    /// Attach a correlation id to the payload
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.payload
            .insert(REQUEST_ID_KEY.to_string(), Value::String(request_id.into()));
        self
    }

    /// Correlation id carried in the payload, if any
    pub fn request_id(&self) -> Option<&str> {
        self.payload.get(REQUEST_ID_KEY).and_then(Value::as_str)
    }

    /// Error description carried in the payload, if any
    pub fn error_message(&self) -> Option<&str> {
        self.payload.get(ERROR_KEY).and_then(Value::as_str)
    }

    /// Serialize to the flat JSON wire format
    pub fn to_json(&self) -> MeshResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the wire format
    ///
    /// The raw text is kept in the error so callers can log what was dropped.
    pub fn from_json(raw: &str) -> MeshResult<Self> {
        serde_json::from_str(raw).map_err(|e| MeshError::DeserializationFailed {
            reason: e.to_string(),
            raw: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format_is_flat() {
        let mut payload = Payload::new();
        payload.insert("tool_name".into(), json!("perform_research"));
        let envelope = Envelope::tool_command("orchestrator", payload);

        let value: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(value["sender_id"], "orchestrator");
        assert_eq!(value["message_type"], "tool_command");
        assert_eq!(value["payload"]["tool_name"], "perform_research");
        assert_eq!(value.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_decode_rejects_unknown_message_type() {
        let raw = r#"{"sender_id":"a","message_type":"gossip","payload":{}}"#;
        let err = Envelope::from_json(raw).unwrap_err();
        assert!(err.is_decode_error());
        assert!(err.to_string().contains("gossip"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = Envelope::from_json("not json").unwrap_err();
        match err {
            MeshError::DeserializationFailed { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_envelope_shape() {
        let envelope = Envelope::error("agent-1", "Unknown tool: x").with_request_id("r-1");
        assert_eq!(envelope.message_type, MessageType::Error);
        assert_eq!(envelope.error_message(), Some("Unknown tool: x"));
        assert_eq!(envelope.request_id(), Some("r-1"));
    }

    #[test]
    fn test_message_type_reply_classification() {
        assert!(MessageType::Result.is_reply());
        assert!(MessageType::Error.is_reply());
        assert!(!MessageType::ToolCommand.is_reply());
        assert!(!MessageType::StatusUpdate.is_reply());
        assert_eq!(MessageType::StatusUpdate.to_string(), "status_update");
    }
}
