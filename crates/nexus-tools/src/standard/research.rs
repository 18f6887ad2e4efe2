//! Simulated research lookups

use async_trait::async_trait;
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ToolError;
use crate::tool::{ParameterType, Tool, ToolArguments, ToolDefinition};

/// Directory the internal documents are read from by default
pub const DEFAULT_DOCS_DIR: &str = "/app/mock_data";

/// File searched by the `internal_docs` source
pub const INTERNAL_REPORT_FILE: &str = "report_q2_2025.txt";

const TOOL_NAME: &str = "perform_research";

/// Answers queries from a canned web index or from an internal report on disk
#[derive(Debug, Clone)]
pub struct PerformResearch {
    docs_dir: PathBuf,
}

impl Default for PerformResearch {
    fn default() -> Self {
        Self::new(DEFAULT_DOCS_DIR)
    }
}

impl PerformResearch {
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
        }
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    fn web_mock(query: &str) -> Value {
        let q = query.to_lowercase();
        let result = if q.contains("ai-driven services") {
            "AI-driven services are rapidly expanding, particularly in logistics and automation. Increased demand is projected over the next 5 years.".to_string()
        } else if q.contains("project alpha") {
            "Project Alpha information: The new automated testing procedure has significantly boosted efficiency. Details are in internal Q2 report.".to_string()
        } else {
            format!("Simulated web search for '{}' found no direct match.", query)
        };
        json!({ "result": result, "source": "simulated_web_search" })
    }

    async fn internal_docs(&self, query: &str) -> Result<Value, ToolError> {
        let path = self.docs_dir.join(INTERNAL_REPORT_FILE);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(json!({
                    "error": format!("Internal document '{}' not found.", INTERNAL_REPORT_FILE),
                    "source": "internal_document_error",
                }));
            }
            Err(e) => {
                return Err(ToolError::failed(
                    TOOL_NAME,
                    format!("cannot read '{}': {}", path.display(), e),
                ));
            }
        };

        let result = if content.to_lowercase().contains(&query.to_lowercase()) {
            format!(
                "Found relevant info in '{}': \n---\n{}\n---",
                path.display(),
                content
            )
        } else {
            format!(
                "Found internal document '{}', but query '{}' not found within.",
                path.display(),
                query
            )
        };

        Ok(json!({ "result": result, "source": "internal_document" }))
    }
}

#[async_trait]
impl Tool for PerformResearch {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_NAME,
            "Simulated web research and internal document lookup",
        )
        .required_parameter("query", ParameterType::String, "What to look up")
        .optional_parameter(
            "source",
            ParameterType::String,
            "Where to look: 'web_mock' or 'internal_docs'",
            Some(json!("web_mock")),
        )
    }

    async fn execute(&self, args: &ToolArguments) -> Result<Value, ToolError> {
        let query = args.require_str("query")?;
        let source = args.str_or("source", "web_mock")?;
        info!(query = %query, source = %source, "Performing research");

        match source {
            "web_mock" => Ok(Self::web_mock(query)),
            "internal_docs" => self.internal_docs(query).await,
            other => Ok(json!({
                "error": format!("Unknown research source: {}", other),
                "source": "invalid_source",
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    const REPORT: &str = "Confidential Internal Report - Q2 2025 Summary:\n\
        Project Alpha saw a 15% increase in efficiency due to new automated testing.\n";

    fn args(value: Value) -> ToolArguments {
        ToolArguments::new(TOOL_NAME, value.as_object().cloned().unwrap_or_else(Map::new))
    }

    #[tokio::test]
    async fn test_web_mock_canned_answers_are_case_insensitive() {
        let tool = PerformResearch::default();

        let out = tool
            .execute(&args(json!({"query": "Trends in AI-Driven Services"})))
            .await
            .unwrap();
        assert!(out["result"].as_str().unwrap().starts_with("AI-driven services"));
        assert_eq!(out["source"], "simulated_web_search");

        let out = tool
            .execute(&args(json!({"query": "PROJECT ALPHA status"})))
            .await
            .unwrap();
        assert!(out["result"].as_str().unwrap().starts_with("Project Alpha information"));
    }

    #[tokio::test]
    async fn test_web_mock_no_match() {
        let out = PerformResearch::default()
            .execute(&args(json!({"query": "weather"})))
            .await
            .unwrap();
        assert_eq!(
            out["result"],
            "Simulated web search for 'weather' found no direct match."
        );
    }

    #[tokio::test]
    async fn test_internal_docs_hit_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INTERNAL_REPORT_FILE), REPORT).unwrap();
        let tool = PerformResearch::new(dir.path());

        let hit = tool
            .execute(&args(json!({"query": "project alpha", "source": "internal_docs"})))
            .await
            .unwrap();
        assert_eq!(hit["source"], "internal_document");
        let text = hit["result"].as_str().unwrap();
        assert!(text.starts_with("Found relevant info in '"));
        assert!(text.contains("15% increase"));

        let miss = tool
            .execute(&args(json!({"query": "project gamma", "source": "internal_docs"})))
            .await
            .unwrap();
        assert!(
            miss["result"]
                .as_str()
                .unwrap()
                .ends_with("but query 'project gamma' not found within.")
        );
    }

    #[tokio::test]
    async fn test_internal_docs_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = PerformResearch::new(dir.path())
            .execute(&args(json!({"query": "x", "source": "internal_docs"})))
            .await
            .unwrap();
        assert_eq!(
            out,
            json!({
                "error": "Internal document 'report_q2_2025.txt' not found.",
                "source": "internal_document_error",
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_source_and_missing_query() {
        let tool = PerformResearch::default();
        let out = tool
            .execute(&args(json!({"query": "x", "source": "library"})))
            .await
            .unwrap();
        assert_eq!(out["error"], "Unknown research source: library");
        assert_eq!(out["source"], "invalid_source");

        let err = tool.execute(&args(json!({}))).await.unwrap_err();
        assert_eq!(err, ToolError::missing(TOOL_NAME, "query"));
    }
}
