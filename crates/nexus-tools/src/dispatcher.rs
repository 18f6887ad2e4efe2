//! Decode-validate-invoke-report boundary between the run loop and the tools

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::call::ToolCall;
use crate::registry::ToolRegistry;
use crate::tool::{ToolArguments, ToolDefinition};

/// Prefix of the error text reported when a command could not be processed
pub const PROCESSING_ERROR_PREFIX: &str = "Error processing tool command in agent";

/// Build the `{"error": message}` payload carried by failure replies
pub fn error_payload(message: impl Into<String>) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("error".to_string(), Value::String(message.into()));
    payload
}

/// Whether declared parameter schemas are enforced before a tool runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentPolicy {
    /// Pass arguments through untouched; tools apply their own defaults
    #[default]
    Lenient,
    /// Reject calls that miss a required parameter or mistype a declared one
    Enforce,
}

impl FromStr for ArgumentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(ArgumentPolicy::Lenient),
            "enforce" => Ok(ArgumentPolicy::Enforce),
            other => Err(format!(
                "unknown argument policy '{}' (expected 'lenient' or 'enforce')",
                other
            )),
        }
    }
}

impl fmt::Display for ArgumentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentPolicy::Lenient => f.write_str("lenient"),
            ArgumentPolicy::Enforce => f.write_str("enforce"),
        }
    }
}

/// What came of dispatching one tool call
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The call was handled; the payload may still carry an `error` key,
    /// e.g. for an unknown tool or a tool-level refusal
    Completed(Map<String, Value>),
    /// Rejected arguments, tool error or panic
    Failed(Map<String, Value>),
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DispatchOutcome::Completed(_))
    }

    pub fn payload(&self) -> &Map<String, Value> {
        match self {
            DispatchOutcome::Completed(p) | DispatchOutcome::Failed(p) => p,
        }
    }

    pub fn into_payload(self) -> Map<String, Value> {
        match self {
            DispatchOutcome::Completed(p) | DispatchOutcome::Failed(p) => p,
        }
    }
}

/// Routes decoded tool calls to the agent's tools
///
/// Never fails outward: an unknown tool is reported as a completed
/// `{"error": "Unknown tool: ..."}` payload and every other problem becomes a
/// [`DispatchOutcome::Failed`], so the run loop always has a reply to send.
#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<dyn ToolRegistry>,
    policy: ArgumentPolicy,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<dyn ToolRegistry>) -> Self {
        Self {
            registry,
            policy: ArgumentPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ArgumentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ArgumentPolicy {
        self.policy
    }

    /// Schemas of every tool this dispatcher can reach
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    pub async fn dispatch(&self, call: &ToolCall) -> DispatchOutcome {
        let name = call.tool_name.as_str();

        let Some(tool) = self.registry.get(name) else {
            warn!(tool = %name, "Unknown tool requested");
            return DispatchOutcome::Completed(error_payload(format!("Unknown tool: {}", name)));
        };

        if self.policy == ArgumentPolicy::Enforce {
            if let Err(reason) = tool.definition().check_arguments(&call.tool_arguments) {
                warn!(tool = %name, reason = %reason, "Rejected tool arguments");
                return DispatchOutcome::Failed(error_payload(format!(
                    "Invalid arguments for {}: {}",
                    name, reason
                )));
            }
        }

        let args = ToolArguments::new(name, call.tool_arguments.clone());
        let started = Instant::now();
        let result = AssertUnwindSafe(tool.execute(&args)).catch_unwind().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(value)) => {
                debug!(tool = %name, elapsed_ms, "Tool completed");
                DispatchOutcome::Completed(into_object(value))
            }
            Ok(Err(e)) => {
                warn!(tool = %name, elapsed_ms, error = %e, "Tool returned an error");
                DispatchOutcome::Failed(error_payload(format!(
                    "{}: {}",
                    PROCESSING_ERROR_PREFIX, e
                )))
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!(tool = %name, elapsed_ms, panic = %reason, "Tool panicked");
                DispatchOutcome::Failed(error_payload(format!(
                    "{}: tool '{}' panicked: {}",
                    PROCESSING_ERROR_PREFIX, name, reason
                )))
            }
        }
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("output".to_string(), other);
            map
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::registry::InMemoryToolRegistry;
    use crate::tool::{ParameterType, Tool};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echo text")
                .required_parameter("text", ParameterType::String, "Text")
        }

        async fn execute(&self, args: &ToolArguments) -> Result<Value, ToolError> {
            Ok(json!({ "text": args.str_or("text", "default")? }))
        }
    }

    struct Scalar;

    #[async_trait]
    impl Tool for Scalar {
        fn name(&self) -> &str {
            "scalar"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("scalar", "Returns a bare number")
        }

        async fn execute(&self, _args: &ToolArguments) -> Result<Value, ToolError> {
            Ok(json!(42))
        }
    }

    struct Broken;

    #[async_trait]
    impl Tool for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("broken", "Always fails")
        }

        async fn execute(&self, _args: &ToolArguments) -> Result<Value, ToolError> {
            Err(ToolError::failed("broken", "disk on fire"))
        }
    }

    struct Panics;

    #[async_trait]
    impl Tool for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("panics", "Panics")
        }

        async fn execute(&self, _args: &ToolArguments) -> Result<Value, ToolError> {
            panic!("boom");
        }
    }

    fn dispatcher() -> CommandDispatcher {
        let registry = InMemoryToolRegistry::new()
            .with_tool(Arc::new(Echo))
            .with_tool(Arc::new(Scalar))
            .with_tool(Arc::new(Broken))
            .with_tool(Arc::new(Panics));
        CommandDispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_known_tool_completes() {
        let outcome = dispatcher()
            .dispatch(&ToolCall::new("echo").with_argument("text", "hi"))
            .await;
        assert!(outcome.is_completed());
        assert_eq!(outcome.payload()["text"], "hi");
    }

    #[tokio::test]
    async fn test_lenient_policy_lets_tool_apply_defaults() {
        let outcome = dispatcher().dispatch(&ToolCall::new("echo")).await;
        let expected = json!({"text": "default"}).as_object().unwrap().clone();
        assert_eq!(outcome, DispatchOutcome::Completed(expected));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_and_stable() {
        let d = dispatcher();
        let first = d.dispatch(&ToolCall::new("nonexistent")).await;
        let second = d.dispatch(&ToolCall::new("nonexistent")).await;

        assert!(first.is_completed());
        assert_eq!(first.payload()["error"], "Unknown tool: nonexistent");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_non_object_output_is_wrapped() {
        let outcome = dispatcher().dispatch(&ToolCall::new("scalar")).await;
        assert_eq!(outcome.payload()["output"], 42);
    }

    #[tokio::test]
    async fn test_tool_error_becomes_failed_payload() {
        let outcome = dispatcher().dispatch(&ToolCall::new("broken")).await;
        assert!(!outcome.is_completed());
        let message = outcome.payload()["error"].as_str().unwrap();
        assert!(message.starts_with(PROCESSING_ERROR_PREFIX));
        assert!(message.contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let d = dispatcher();
        let outcome = d.dispatch(&ToolCall::new("panics")).await;
        assert!(!outcome.is_completed());
        assert!(outcome.payload()["error"].as_str().unwrap().contains("boom"));

        // The dispatcher stays usable afterwards
        assert!(d.dispatch(&ToolCall::new("scalar")).await.is_completed());
    }

    #[tokio::test]
    async fn test_enforce_policy_rejects_missing_required() {
        let d = dispatcher().with_policy(ArgumentPolicy::Enforce);
        let outcome = d.dispatch(&ToolCall::new("echo")).await;
        assert!(!outcome.is_completed());
        assert_eq!(
            outcome.payload()["error"],
            "Invalid arguments for echo: missing required parameter 'text'"
        );

        let ok = d.dispatch(&ToolCall::new("echo").with_argument("text", "x")).await;
        assert!(ok.is_completed());
    }

    #[test]
    fn test_argument_policy_parsing() {
        assert_eq!("lenient".parse::<ArgumentPolicy>(), Ok(ArgumentPolicy::Lenient));
        assert_eq!(" ENFORCE ".parse::<ArgumentPolicy>(), Ok(ArgumentPolicy::Enforce));
        assert!("strict".parse::<ArgumentPolicy>().is_err());
        assert_eq!(ArgumentPolicy::default(), ArgumentPolicy::Lenient);
        assert_eq!(ArgumentPolicy::Enforce.to_string(), "enforce");
    }
}
