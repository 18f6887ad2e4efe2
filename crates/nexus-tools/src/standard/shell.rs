//! Whitelisted command execution

use async_trait::async_trait;
use serde_json::{Value, json};
use std::io::ErrorKind;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::ToolError;
use crate::tool::{ParameterType, SchemaType, Tool, ToolArguments, ToolDefinition};

/// Commands the ops agent is allowed to run
pub const WHITELISTED_COMMANDS: &[&str] = &["ls", "echo", "cat", "pwd", "date"];

const TOOL_NAME: &str = "execute_shell_command";

/// Runs one of a fixed set of harmless commands without a shell
///
/// Arguments are passed straight to the process, so there is no shell
/// expansion or piping.
#[derive(Debug, Clone, Default)]
pub struct ExecuteShellCommand;

#[async_trait]
impl Tool for ExecuteShellCommand {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(TOOL_NAME, "Execute safe shell commands, list files")
            .required_parameter(
                "command",
                ParameterType::String,
                "One of: ls, echo, cat, pwd, date",
            )
            .optional_parameter(
                "args",
                SchemaType::Union(vec![ParameterType::Array, ParameterType::String]),
                "Arguments passed to the command",
                Some(json!([])),
            )
    }

    async fn execute(&self, args: &ToolArguments) -> Result<Value, ToolError> {
        let command = args.require_str("command")?;
        let arguments = args.string_list("args")?;

        if !WHITELISTED_COMMANDS.contains(&command) {
            warn!(command = %command, "Refused non-whitelisted command");
            return Ok(json!({
                "error": format!("Command '{}' is not whitelisted for execution.", command)
            }));
        }

        info!(command = %command, args = ?arguments, "Executing command");

        let output = match Command::new(command).args(&arguments).output().await {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(json!({
                    "error": format!(
                        "Command '{}' not found. Check if it's installed and in PATH.",
                        command
                    )
                }));
            }
            Err(e) => {
                return Ok(json!({
                    "error": format!(
                        "An unexpected error occurred during command execution: {}",
                        e
                    )
                }));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            Ok(json!({ "stdout": stdout, "stderr": stderr, "success": true }))
        } else {
            Ok(json!({
                "stdout": stdout,
                "stderr": stderr,
                "success": false,
                "return_code": output.status.code(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn args(value: Value) -> ToolArguments {
        ToolArguments::new(TOOL_NAME, value.as_object().cloned().unwrap_or_else(Map::new))
    }

    #[tokio::test]
    async fn test_rejects_non_whitelisted_command() {
        let out = ExecuteShellCommand
            .execute(&args(json!({"command": "rm", "args": ["-rf", "/"]})))
            .await
            .unwrap();
        assert_eq!(out, json!({"error": "Command 'rm' is not whitelisted for execution."}));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_with_list_and_single_string_args() {
        let out = ExecuteShellCommand
            .execute(&args(json!({"command": "echo", "args": ["hello", "nexus"]})))
            .await
            .unwrap();
        assert_eq!(out["stdout"], "hello nexus");
        assert_eq!(out["stderr"], "");
        assert_eq!(out["success"], true);
        assert!(out.get("return_code").is_none());

        let out = ExecuteShellCommand
            .execute(&args(json!({"command": "echo", "args": "solo"})))
            .await
            .unwrap();
        assert_eq!(out["stdout"], "solo");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_command_reports_return_code() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.txt");

        let out = ExecuteShellCommand
            .execute(&args(json!({
                "command": "cat",
                "args": [missing.to_string_lossy()],
            })))
            .await
            .unwrap();
        assert_eq!(out["success"], false);
        assert_ne!(out["return_code"], json!(0));
        assert!(!out["stderr"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_command_is_tool_error() {
        let err = ExecuteShellCommand.execute(&args(json!({}))).await.unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument { .. }));
    }
}
