//! Tool schema and tool call types

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Named parameters of a tool and the subset that is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name to JSON Schema
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Names of required parameters, in declaration order
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParameterSchema {
    /// Build from a provider's `inputSchema` object
    ///
    /// Missing or mistyped `properties`/`required` entries default to empty.
    pub fn from_input_schema(schema: &Value) -> Self {
        let properties = schema
            .get("properties")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        let required = schema
            .get("required")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            properties,
            required,
        }
    }

    /// The parameter a best-effort argument recovery should target
    ///
    /// First required parameter, else the only declared parameter.
    pub fn expected_field(&self) -> Option<&str> {
        if let Some(first) = self.required.first() {
            return Some(first);
        }
        if self.properties.len() == 1 {
            return self.properties.keys().next().map(String::as_str);
        }
        None
    }

    /// JSON Schema object form
    pub fn to_json(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Tool definition as exposed to the model
///
/// Once registered, `name` is the qualified (provider-prefixed) name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name (local before registration, qualified after)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// Parameter schema
    #[serde(default)]
    pub parameters: ParameterSchema,
}

impl ToolSchema {
    /// Create a new tool definition with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::default(),
        }
    }

    /// Set the parameters from a raw `inputSchema`
    pub fn with_input_schema(mut self, schema: &Value) -> Self {
        self.parameters = ParameterSchema::from_input_schema(schema);
        self
    }

    /// Copy of this schema renamed under a namespace prefix
    pub fn qualified(&self, prefix: &str, separator: &str) -> Self {
        Self {
            name: format!("{}{}{}", prefix, separator, self.name),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// OpenAI-style function definition used in the tool catalogue
    pub fn to_function_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters.to_json(),
            }
        })
    }
}

/// The kind tag written in front of a tool call
///
/// Only `function` exists today; other tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallKind {
    Function,
    Other(String),
}

impl CallKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "function" => CallKind::Function,
            other => CallKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CallKind::Function => "function",
            CallKind::Other(tag) => tag,
        }
    }
}

impl Default for CallKind {
    fn default() -> Self {
        CallKind::Function
    }
}

impl From<String> for CallKind {
    fn from(tag: String) -> Self {
        CallKind::from_tag(&tag)
    }
}

impl From<CallKind> for String {
    fn from(kind: CallKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A tool call extracted from a completion
///
/// `id` is only unique within the batch it was parsed from. Arguments stay as
/// raw text until dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Batch-local identifier (`call_0`, `call_1`, ...)
    pub id: String,
    /// Call kind tag
    #[serde(default)]
    pub kind: CallKind,
    /// Qualified tool name as written by the model
    pub tool_name: String,
    /// Argument text as written by the model
    pub raw_arguments: String,
}

impl ToolCallRecord {
    /// Create a new `function` call record
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        raw_arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: CallKind::Function,
            tool_name: tool_name.into(),
            raw_arguments: raw_arguments.into(),
        }
    }

    /// Set the call kind
    pub fn with_kind(mut self, kind: CallKind) -> Self {
        self.kind = kind;
        self
    }

    /// Id for the call at `index` within one parse pass
    pub fn ordinal_id(index: usize) -> String {
        format!("call_{}", index)
    }

    /// Strict JSON decode of the arguments
    pub fn parse_arguments(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.raw_arguments)
    }
}

/// Result of dispatching a tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// Qualified name of the tool that was called
    #[serde(rename = "toolName")]
    pub tool_name: String,
    /// The result content
    pub content: String,
    /// Whether this result represents an error
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: error.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_schema_from_input_schema() {
        let schema = ParameterSchema::from_input_schema(&json!({
            "type": "object",
            "properties": {
                "location": { "type": "string" },
                "units": { "type": "string" }
            },
            "required": ["location"]
        }));

        assert_eq!(schema.properties.len(), 2);
        assert_eq!(schema.required, vec!["location".to_string()]);
        assert_eq!(schema.expected_field(), Some("location"));
    }

    #[test]
    fn test_parameter_schema_tolerates_missing_fields() {
        let schema = ParameterSchema::from_input_schema(&json!({ "type": "object" }));
        assert!(schema.properties.is_empty());
        assert!(schema.required.is_empty());
        assert_eq!(schema.expected_field(), None);
    }

    #[test]
    fn test_expected_field_single_optional_parameter() {
        let schema = ParameterSchema::from_input_schema(&json!({
            "properties": { "query": { "type": "string" } }
        }));
        assert_eq!(schema.expected_field(), Some("query"));
    }

    #[test]
    fn test_qualified_schema() {
        let tool = ToolSchema::new("search", "Search the web");
        let qualified = tool.qualified("brave", "__");
        assert_eq!(qualified.name, "brave__search");
        assert_eq!(qualified.description, "Search the web");
    }

    #[test]
    fn test_function_json_shape() {
        let tool = ToolSchema::new("get_weather", "Get the current weather").with_input_schema(
            &json!({
                "properties": { "location": { "type": "string" } },
                "required": ["location"]
            }),
        );

        let value = tool.to_function_json();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "get_weather");
        assert_eq!(value["function"]["parameters"]["type"], "object");
        assert_eq!(value["function"]["parameters"]["required"][0], "location");
    }

    #[test]
    fn test_call_kind_tags() {
        assert_eq!(CallKind::from_tag("function"), CallKind::Function);
        assert_eq!(
            CallKind::from_tag("retrieval"),
            CallKind::Other("retrieval".to_string())
        );
        assert_eq!(CallKind::Other("x".to_string()).as_str(), "x");
    }

    #[test]
    fn test_tool_call_parse_arguments() {
        let call = ToolCallRecord::new(ToolCallRecord::ordinal_id(0), "fs__read", r#"{"path":"/tmp"}"#);
        assert_eq!(call.id, "call_0");
        assert_eq!(call.parse_arguments().unwrap()["path"], "/tmp");

        let broken = ToolCallRecord::new("call_1", "fs__read", "{oops");
        assert!(broken.parse_arguments().is_err());
    }

    #[test]
    fn test_tool_result() {
        let success = ToolResult::success("call_0", "weather__now", "72°F, sunny");
        assert!(!success.is_error);

        let error = ToolResult::error("call_1", "weather__now", "Location not found");
        assert!(error.is_error);
    }
}
