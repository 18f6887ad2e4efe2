//! Tool execution errors

use thiserror::Error;

/// Errors a tool can return from [`Tool::execute`](crate::Tool::execute)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// A required argument was not supplied
    #[error("Tool '{tool}' missing required argument '{argument}'")]
    MissingArgument { tool: String, argument: String },

    /// An argument had the wrong shape
    #[error("Tool '{tool}' received invalid argument '{argument}': {reason}")]
    InvalidArgument {
        tool: String,
        argument: String,
        reason: String,
    },

    /// The tool ran but could not finish
    #[error("Tool '{tool}' execution failed: {message}")]
    ExecutionFailed { tool: String, message: String },
}

impl ToolError {
    pub fn missing(tool: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::MissingArgument {
            tool: tool.into(),
            argument: argument.into(),
        }
    }

    pub fn invalid(
        tool: impl Into<String>,
        argument: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            tool: tool.into(),
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
