//! Simulated outbound messaging

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::error::ToolError;
use crate::tool::{ParameterType, Tool, ToolArguments, ToolDefinition};

const TOOL_NAME: &str = "send_communication";

/// Pretends to deliver a message over SMS, email or chat
#[derive(Debug, Clone, Default)]
pub struct SendCommunication;

#[async_trait]
impl Tool for SendCommunication {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(TOOL_NAME, "Send SMS, Email, Real-time Chat")
            .required_parameter("recipient", ParameterType::String, "Who receives the message")
            .required_parameter("channel", ParameterType::String, "sms, email or chat")
            .required_parameter("message_content", ParameterType::String, "Message body")
            .optional_parameter("subject", ParameterType::String, "Subject line", None)
    }

    async fn execute(&self, args: &ToolArguments) -> Result<Value, ToolError> {
        let recipient = args.require_str("recipient")?;
        let channel = args.require_str("channel")?;
        let content = args.require_str("message_content")?;
        let subject = args.optional_str("subject")?;

        info!(
            recipient = %recipient,
            channel = %channel,
            subject = subject.unwrap_or(""),
            length = content.len(),
            "Sending communication"
        );

        Ok(json!({
            "status": "success",
            "message": format!("Message sent via {} to {}.", channel, recipient),
        }))
    }
}
