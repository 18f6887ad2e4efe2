//! The tool interface every agent capability implements

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ToolError;

/// JSON types a parameter can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Integer => "integer",
            ParameterType::Boolean => "boolean",
            ParameterType::Array => "array",
            ParameterType::Object => "object",
        }
    }

    /// Whether `value` has this JSON type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterType::String => value.is_string(),
            ParameterType::Number => value.is_number(),
            ParameterType::Integer => value.is_i64() || value.is_u64(),
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Array => value.is_array(),
            ParameterType::Object => value.is_object(),
        }
    }
}

/// The `type` keyword of a parameter: one type or a union of types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(ParameterType),
    Union(Vec<ParameterType>),
}

impl SchemaType {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            SchemaType::Single(t) => t.accepts(value),
            SchemaType::Union(types) => types.iter().any(|t| t.accepts(value)),
        }
    }
}

impl From<ParameterType> for SchemaType {
    fn from(t: ParameterType) -> Self {
        SchemaType::Single(t)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaType::Single(t) => f.write_str(t.as_str()),
            SchemaType::Union(types) => {
                let names: Vec<&str> = types.iter().map(ParameterType::as_str).collect();
                f.write_str(&names.join(" or "))
            }
        }
    }
}

/// Schema fragment describing one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// The `parameters` object of a tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, ParameterSchema>,
    pub required: Vec<String>,
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self {
            kind: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// Static description of a tool: its name, purpose and parameter schema
///
/// ```
/// use nexus_tools::{ParameterType, ToolDefinition};
///
/// let def = ToolDefinition::new("plan_task", "Break a request into tool calls")
///     .required_parameter("request", ParameterType::String, "High-level request");
///
/// assert_eq!(def.parameters.required, vec!["request".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ToolParameters::default(),
        }
    }

    /// Declare a parameter the caller must supply
    pub fn required_parameter(
        mut self,
        name: &str,
        kind: impl Into<SchemaType>,
        description: &str,
    ) -> Self {
        self.insert(name, kind.into(), description, None);
        self.parameters.required.push(name.to_string());
        self
    }

    /// Declare an optional parameter, with the default the tool applies when absent
    pub fn optional_parameter(
        mut self,
        name: &str,
        kind: impl Into<SchemaType>,
        description: &str,
        default: Option<Value>,
    ) -> Self {
        self.insert(name, kind.into(), description, default);
        self
    }

    fn insert(&mut self, name: &str, kind: SchemaType, description: &str, default: Option<Value>) {
        self.parameters.properties.insert(
            name.to_string(),
            ParameterSchema {
                kind,
                description: description.to_string(),
                default,
            },
        );
    }

    /// Check arguments against the declared schema
    ///
    /// Every `required` parameter must be present and non-null, and every
    /// declared parameter that is present must match its type. Undeclared
    /// arguments are ignored.
    pub fn check_arguments(&self, arguments: &Map<String, Value>) -> Result<(), String> {
        for name in &self.parameters.required {
            match arguments.get(name) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required parameter '{}'", name));
                }
                Some(_) => {}
            }
        }

        for (name, value) in arguments {
            if value.is_null() {
                continue;
            }
            let Some(schema) = self.parameters.properties.get(name) else {
                continue;
            };
            if !schema.kind.accepts(value) {
                return Err(format!("parameter '{}' must be of type {}", name, schema.kind));
            }
        }

        Ok(())
    }
}

/// Arguments handed to a tool, with typed accessors
///
/// Absent and `null` arguments read as `None`; tools apply their own defaults.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    tool: String,
    values: Map<String, Value>,
}

impl ToolArguments {
    pub fn new(tool: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    /// Optional string argument; a non-string value is an error
    pub fn optional_str(&self, name: &str) -> Result<Option<&str>, ToolError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ToolError::invalid(
                &self.tool,
                name,
                format!("expected a string, got {}", other),
            )),
        }
    }

    /// String argument that must be present
    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        self.optional_str(name)?
            .ok_or_else(|| ToolError::missing(&self.tool, name))
    }

    /// String argument falling back to `default` when absent
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str, ToolError> {
        Ok(self.optional_str(name)?.unwrap_or(default))
    }

    /// List of strings; a single string reads as a one-element list
    pub fn string_list(&self, name: &str) -> Result<Vec<String>, ToolError> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(ToolError::invalid(
                        &self.tool,
                        name,
                        format!("list entries must be strings, got {}", other),
                    )),
                })
                .collect(),
            Some(other) => Err(ToolError::invalid(
                &self.tool,
                name,
                format!("expected a string or list of strings, got {}", other),
            )),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// A named capability an agent exposes over the bus
///
/// Tools return a JSON value. An object becomes the reply payload as is;
/// anything else is wrapped as `{"output": value}`. Tool-level problems that
/// the caller should see as a normal result (a command that is not
/// whitelisted, a missing document) are returned as `Ok` payloads carrying an
/// `error` key; `Err` is reserved for calls the tool could not process.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use nexus_tools::{Tool, ToolArguments, ToolDefinition, ToolError, ParameterType};
/// use serde_json::{Value, json};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Tool for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn definition(&self) -> ToolDefinition {
///         ToolDefinition::new("echo", "Echo the input back")
///             .required_parameter("text", ParameterType::String, "Text to echo")
///     }
///
///     async fn execute(&self, args: &ToolArguments) -> Result<Value, ToolError> {
///         Ok(json!({ "text": args.require_str("text")? }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the tool is dispatched under
    fn name(&self) -> &str;

    /// Schema advertised for this tool
    fn definition(&self) -> ToolDefinition;

    /// Run the tool
    async fn execute(&self, args: &ToolArguments) -> Result<Value, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArguments {
        ToolArguments::new("t", value.as_object().cloned().unwrap_or_default())
    }

    fn shell_like() -> ToolDefinition {
        ToolDefinition::new("execute_shell_command", "Run a command")
            .required_parameter("command", ParameterType::String, "Command")
            .optional_parameter(
                "args",
                SchemaType::Union(vec![ParameterType::Array, ParameterType::String]),
                "Arguments",
                Some(json!([])),
            )
    }

    #[test]
    fn test_definition_serializes_as_json_schema() {
        let value = serde_json::to_value(shell_like()).unwrap();
        assert_eq!(value["parameters"]["type"], "object");
        assert_eq!(value["parameters"]["required"], json!(["command"]));
        assert_eq!(
            value["parameters"]["properties"]["command"]["type"],
            "string"
        );
        assert_eq!(
            value["parameters"]["properties"]["args"]["type"],
            json!(["array", "string"])
        );
        assert_eq!(value["parameters"]["properties"]["args"]["default"], json!([]));
    }

    #[test]
    fn test_check_arguments_accepts_valid_and_union_types() {
        let def = shell_like();
        let ok_list = json!({"command": "ls", "args": ["-la"]});
        let ok_str = json!({"command": "echo", "args": "hi", "extra": 1});
        assert!(def.check_arguments(ok_list.as_object().unwrap()).is_ok());
        assert!(def.check_arguments(ok_str.as_object().unwrap()).is_ok());
    }

    #[test]
    fn test_check_arguments_reports_missing_and_mistyped() {
        let def = shell_like();

        let missing = json!({"args": []});
        assert_eq!(
            def.check_arguments(missing.as_object().unwrap()),
            Err("missing required parameter 'command'".to_string())
        );

        let null = json!({"command": null});
        assert!(def.check_arguments(null.as_object().unwrap()).is_err());

        let mistyped = json!({"command": "ls", "args": 5});
        assert_eq!(
            def.check_arguments(mistyped.as_object().unwrap()),
            Err("parameter 'args' must be of type array or string".to_string())
        );
    }

    #[test]
    fn test_argument_accessors() {
        let a = args(json!({"query": "x", "n": 3, "none": null}));
        assert_eq!(a.require_str("query").unwrap(), "x");
        assert_eq!(a.str_or("source", "web_mock").unwrap(), "web_mock");
        assert_eq!(a.optional_str("none").unwrap(), None);
        assert!(matches!(
            a.require_str("missing"),
            Err(ToolError::MissingArgument { .. })
        ));
        assert!(matches!(
            a.optional_str("n"),
            Err(ToolError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_string_list_accepts_single_string() {
        let a = args(json!({"one": "-l", "many": ["-l", "-a"], "bad": [1], "num": 2}));
        assert_eq!(a.string_list("one").unwrap(), vec!["-l"]);
        assert_eq!(a.string_list("many").unwrap(), vec!["-l", "-a"]);
        assert!(a.string_list("absent").unwrap().is_empty());
        assert!(a.string_list("bad").is_err());
        assert!(a.string_list("num").is_err());
    }
}
