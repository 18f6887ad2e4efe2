//! Keyword-based task planning

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::call::ToolCall;
use crate::error::ToolError;
use crate::tool::{ParameterType, Tool, ToolArguments, ToolDefinition};

const TOOL_NAME: &str = "plan_task";

/// Turns a high-level request into an ordered list of tool calls
#[derive(Debug, Clone, Default)]
pub struct PlanTask;

impl PlanTask {
    /// Plan for `request`, with a human-readable description
    pub fn plan(request: &str) -> (Vec<ToolCall>, String) {
        let lowered = request.to_lowercase();

        if lowered.contains("research topic x and email client y") {
            let plan = vec![
                ToolCall::new("perform_research")
                    .with_argument("query", "topic X")
                    .with_argument("source", "internal_docs"),
                ToolCall::new("send_communication")
                    .with_argument("recipient", "client Y")
                    .with_argument("channel", "email")
                    .with_argument(
                        "message_content",
                        "Research results for topic X: [research_result_placeholder]",
                    ),
            ];
            (plan, "Planned research and email task.".to_string())
        } else if lowered.contains("list all agents") {
            let plan = vec![ToolCall::new("get_agent_status").with_argument("agent_id", "all")];
            (plan, "Planned to list all agents.".to_string())
        } else {
            (
                Vec::new(),
                format!(
                    "No specific plan defined for: '{}'. Needs manual review.",
                    request
                ),
            )
        }
    }
}

#[async_trait]
impl Tool for PlanTask {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(TOOL_NAME, "Task planning, request analysis").required_parameter(
            "request",
            ParameterType::String,
            "High-level request to plan",
        )
    }

    async fn execute(&self, args: &ToolArguments) -> Result<Value, ToolError> {
        let request = args.require_str("request")?;
        let (plan, description) = Self::plan(request);
        info!(request = %request, steps = plan.len(), "Planned task");

        let plan = serde_json::to_value(&plan)
            .map_err(|e| ToolError::failed(TOOL_NAME, e.to_string()))?;
        Ok(json!({ "plan": plan, "description": description }))
    }
}
