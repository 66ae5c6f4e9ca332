//! Tool definitions.
//!
//! A tool is a named function the server exposes. Its input is described by
//! a JSON Schema that is computed once, when the definition is built, and
//! stored on the definition.

use serde::{Deserialize, Serialize};

use crate::schema::{SchemaProvider, schema_for};

/// A tool definition exposed by a server.
///
/// ```rust
/// use mcplink_core::types::Tool;
///
/// let tool = Tool::new("search")
///     .description("Search the database")
///     .input_schema(serde_json::json!({
///         "type": "object",
///         "properties": { "query": { "type": "string" } },
///         "required": ["query"]
///     }));
/// assert_eq!(tool.name, "search");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique name of the tool within the tool namespace.
    pub name: String,
    /// Human-readable description of what the tool does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the tool's arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
    /// Behavioral hints for callers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

impl Tool {
    /// Create a tool that accepts an empty object.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            annotations: None,
        }
    }

    /// Set the tool's description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the tool's input schema directly.
    #[must_use]
    pub fn input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Ask a schema provider for the input schema.
    #[must_use]
    pub fn input_schema_from(self, provider: &dyn SchemaProvider) -> Self {
        self.input_schema(provider.schema())
    }

    /// Derive the input schema from a Rust argument type.
    ///
    /// ```rust
    /// use mcplink_core::types::Tool;
    ///
    /// #[derive(schemars::JsonSchema, serde::Deserialize)]
    /// struct AddArgs {
    ///     a: i64,
    ///     b: i64,
    /// }
    ///
    /// let tool = Tool::new("add").with_input::<AddArgs>();
    /// assert!(tool.input_schema["properties"]["a"].is_object());
    /// ```
    #[must_use]
    pub fn with_input<T: schemars::JsonSchema>(self) -> Self {
        self.input_schema(schema_for::<T>())
    }

    /// Set the tool's annotations.
    #[must_use]
    pub const fn annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Check if this tool is marked as read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.annotations
            .and_then(|a| a.read_only_hint)
            .unwrap_or(false)
    }
}

/// Hints about how a tool behaves. Hints are advisory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// The tool does not modify its environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    /// The tool may perform destructive updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    /// Calling the tool repeatedly with the same arguments has no extra effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
}

impl ToolAnnotations {
    /// Annotations for a read-only tool.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
        }
    }
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolRequest {
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments passed to the tool's handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

impl CallToolRequest {
    /// Create a call request.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Option<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tool_wire_form() {
        let tool = Tool::new("echo")
            .description("Echo input")
            .annotations(ToolAnnotations::read_only());
        let json = serde_json::to_value(&tool).unwrap();

        assert_eq!(json["name"], "echo");
        assert_eq!(json["inputSchema"]["type"], "object");
        assert_eq!(json["annotations"]["readOnlyHint"], true);
        assert!(tool.is_read_only());
    }

    #[test]
    fn test_call_request_without_arguments() {
        let req: CallToolRequest =
            serde_json::from_value(serde_json::json!({ "name": "ping" })).unwrap();
        assert_eq!(req, CallToolRequest::new("ping", None));
    }
}
