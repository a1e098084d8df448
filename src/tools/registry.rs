//! Tool registry: name lookup, schema checks and timed execution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::tools::redaction::redact_sensitive_json;
use crate::tools::tool::{Tool, ToolError, ToolOutput, ToolSchema, validate_tool_schema};

/// Registry of tools exposed over MCP.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Rejects schemas that fail [`validate_tool_schema`];
    /// a tool with an existing name replaces the previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        let errors = validate_tool_schema(&tool.parameters_schema(), &name);
        if !errors.is_empty() {
            return Err(ToolError::InvalidSchema { name, errors });
        }
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Replaced previously registered tool");
        } else {
            tracing::debug!(tool = %name, "Registered tool");
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool schemas, sorted by name.
    pub fn list(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Run a tool under its own execution timeout.
    pub async fn execute(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        tracing::debug!(
            tool = %name,
            params = %redact_sensitive_json(&params),
            "Tool call started"
        );

        let timeout = tool.execution_timeout();
        let start = Instant::now();
        let result = tokio::time::timeout(timeout, tool.execute(params)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) => {
                tracing::debug!(
                    tool = %name,
                    elapsed_ms,
                    is_error = output.is_error(),
                    "Tool call finished"
                );
                Ok(output)
            }
            Ok(Err(e)) => {
                tracing::debug!(tool = %name, elapsed_ms, error = %e, "Tool call failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    tool = %name,
                    timeout_secs = timeout.as_secs(),
                    "Tool call timed out"
                );
                Err(ToolError::Timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct FixedTool {
        name: &'static str,
        schema: serde_json::Value,
        delay: Duration,
    }

    impl FixedTool {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                schema: json!({"type": "object", "properties": {}}),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl Tool for FixedTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fixed"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            self.schema.clone()
        }

        async fn execute(&self, _params: serde_json::Value) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(self.delay).await;
            Ok(ToolOutput::success(json!({"ok": true}), self.delay))
        }

        fn execution_timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    #[test]
    fn test_list_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FixedTool::new("zeta"))).unwrap();
        registry.register(Arc::new(FixedTool::new("alpha"))).unwrap();

        let names: Vec<_> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_rejects_bad_schema() {
        let mut registry = ToolRegistry::new();
        let tool = FixedTool {
            schema: json!({"type": "object", "properties": {}, "required": ["x"]}),
            ..FixedTool::new("broken")
        };
        let err = registry.register(Arc::new(tool)).unwrap_err();
        assert!(matches!(err, ToolError::InvalidSchema { ref name, .. } if name == "broken"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(ref n) if n == "nope"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_times_out() {
        let mut registry = ToolRegistry::new();
        let tool = FixedTool {
            delay: Duration::from_secs(10),
            ..FixedTool::new("slow")
        };
        registry.register(Arc::new(tool)).unwrap();

        let err = registry.execute("slow", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_execute_success() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FixedTool::new("fast"))).unwrap();
        let output = registry.execute("fast", json!({})).await.unwrap();
        assert_eq!(output.result, json!({"ok": true}));
    }
}
