//! Tool trait and types.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for tool execution.
///
/// Slack API failures are not errors at this level: tools fold them into
/// an `{"ok": false, "error": ...}` result instead.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid schema for tool '{name}': {}", errors.join("; "))]
    InvalidSchema { name: String, errors: Vec<String> },
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The result data.
    pub result: serde_json::Value,
    /// Time taken.
    pub duration: Duration,
}

impl ToolOutput {
    /// Create a successful output with a JSON result.
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }

    /// Create a text output.
    pub fn text(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            result: serde_json::Value::String(text.into()),
            duration,
        }
    }

    /// Whether the result reports `"ok": false`.
    pub fn is_error(&self) -> bool {
        self.result.get("ok").and_then(|v| v.as_bool()) == Some(false)
    }
}

/// Definition of a tool's parameters using JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Trait for tools exposed over MCP.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get a description of what the tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError>;

    /// Maximum time this tool is allowed to run before the registry gives up.
    /// Retrying Slack tools override this to leave room for backoff.
    /// Default: 60 seconds.
    fn execution_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// Get the tool schema for `tools/list`.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Extract a required string parameter from a JSON object.
///
/// Returns `ToolError::InvalidParameters` if the key is missing or not a string.
pub fn require_str<'a>(params: &'a serde_json::Value, name: &str) -> Result<&'a str, ToolError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{}' parameter", name)))
}

/// Extract an optional string parameter. `null` counts as absent.
pub fn optional_str<'a>(
    params: &'a serde_json::Value,
    name: &str,
) -> Result<Option<&'a str>, ToolError> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| ToolError::InvalidParameters(format!("'{}' must be a string", name))),
    }
}

/// Extract an optional positive integer parameter, falling back to `default`.
pub fn optional_u32(params: &serde_json::Value, name: &str, default: u32) -> Result<u32, ToolError> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(v) => v
            .as_u64()
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                ToolError::InvalidParameters(format!("'{}' must be a positive integer", name))
            }),
    }
}

/// Extract an optional boolean parameter, falling back to `default`.
pub fn optional_bool(params: &serde_json::Value, name: &str, default: bool) -> Result<bool, ToolError> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| ToolError::InvalidParameters(format!("'{}' must be a boolean", name))),
    }
}

/// Extract a required, non-empty array of strings.
pub fn require_str_array(params: &serde_json::Value, name: &str) -> Result<Vec<String>, ToolError> {
    let items = params
        .get(name)
        .and_then(|v| v.as_array())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{}' parameter", name)))?;
    if items.is_empty() {
        return Err(ToolError::InvalidParameters(format!(
            "'{}' must not be empty",
            name
        )));
    }
    items
        .iter()
        .map(|v| {
            v.as_str().map(String::from).ok_or_else(|| {
                ToolError::InvalidParameters(format!("'{}' must contain only strings", name))
            })
        })
        .collect()
}

/// Lenient runtime validation of a tool's `parameters_schema()`.
///
/// Run at registration time to catch structural mistakes (missing
/// `"type": "object"`, orphan `"required"` keys, arrays without `"items"`)
/// before a client ever sees the schema.
///
/// Returns a list of validation errors. An empty list means the schema is valid.
///
/// # Rules enforced
///
/// 1. Top-level must have `"type": "object"`
/// 2. Top-level must have `"properties"` as an object
/// 3. Every key in `"required"` must exist in `"properties"`
/// 4. Nested objects follow the same rules recursively
/// 5. Array properties should have `"items"` defined
///
/// Properties without a `"type"` field are allowed (freeform/any-type).
pub fn validate_tool_schema(schema: &serde_json::Value, path: &str) -> Vec<String> {
    let mut errors = Vec::new();

    // Rule 1: must have "type": "object" at this level
    match schema.get("type").and_then(|t| t.as_str()) {
        Some("object") => {}
        Some(other) => {
            errors.push(format!("{path}: expected type \"object\", got \"{other}\""));
            return errors;
        }
        None => {
            errors.push(format!("{path}: missing \"type\": \"object\""));
            return errors;
        }
    }

    // Rule 2: must have "properties" as an object
    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        errors.push(format!("{path}: missing or non-object \"properties\""));
        return errors;
    };

    // Rule 3: every key in "required" must exist in "properties"
    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for req in required {
            if let Some(key) = req.as_str()
                && !properties.contains_key(key)
            {
                errors.push(format!(
                    "{path}: required key \"{key}\" not found in properties"
                ));
            }
        }
    }

    // Rule 4 & 5: recurse into nested objects and check arrays
    for (key, prop) in properties {
        let prop_path = format!("{path}.{key}");
        match prop.get("type").and_then(|t| t.as_str()) {
            Some("object") => errors.extend(validate_tool_schema(prop, &prop_path)),
            Some("array") => match prop.get("items") {
                Some(items) if items.get("type").and_then(|t| t.as_str()) == Some("object") => {
                    errors.extend(validate_tool_schema(items, &format!("{prop_path}.items")));
                }
                Some(_) => {}
                None => errors.push(format!("{prop_path}: array property missing \"items\"")),
            },
            _ => {}
        }
    }

    errors
}
