//! Tool invocation requests as carried in `tool_command` payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to invoke a named tool
///
/// Serializes to the body of a `tool_command` envelope:
/// `{"tool_name": "...", "tool_arguments": {...}, "request_id": "..."}`.
/// A missing `tool_arguments` decodes as an empty object, and `request_id`
/// is omitted when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    #[serde(default)]
    pub tool_arguments: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_arguments: Map::new(),
            request_id: None,
        }
    }

    /// Add one argument
    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tool_arguments.insert(name.into(), value.into());
        self
    }

    /// Replace all arguments
    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.tool_arguments = arguments;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Decode from an envelope payload
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(payload.clone()))
    }

    /// Encode as an envelope payload
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("tool_name".into(), Value::String(self.tool_name.clone()));
        payload.insert(
            "tool_arguments".into(),
            Value::Object(self.tool_arguments.clone()),
        );
        if let Some(request_id) = &self.request_id {
            payload.insert("request_id".into(), Value::String(request_id.clone()));
        }
        payload
    }
}
