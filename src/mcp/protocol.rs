//! MCP JSON-RPC request handling, independent of transport.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::tools::{ToolError, ToolRegistry, find_prompt, render_prompt, usage_prompts};

pub const MCP_JSONRPC_VERSION: &str = "2.0";
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "slack-mcp";

pub const MCP_ERROR_PARSE: i64 = -32700;
pub const MCP_ERROR_INVALID_REQUEST: i64 = -32600;
pub const MCP_ERROR_METHOD_NOT_FOUND: i64 = -32601;
pub const MCP_ERROR_INVALID_PARAMS: i64 = -32602;

const MCP_CONTENT_TYPE_TEXT: &str = "text";

#[derive(Debug, Clone)]
struct McpJsonRpcRequest {
    /// `None` for notifications.
    id: Option<Value>,
    method: String,
    params: Map<String, Value>,
}

#[derive(Debug, Clone)]
struct McpDispatchError {
    id: Value,
    code: i64,
    message: String,
}

impl McpDispatchError {
    fn new(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            code,
            message: message.into(),
        }
    }

    fn into_frame(self) -> Value {
        jsonrpc_error_frame(self.id, self.code, self.message)
    }
}

/// Serves the Slack tools and usage prompts over MCP.
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw JSON-RPC message. Unparseable input yields a parse error frame.
    pub async fn handle_text(&self, text: &str) -> Option<Value> {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => Some(jsonrpc_error_frame(
                Value::Null,
                MCP_ERROR_PARSE,
                format!("failed to parse jsonrpc message: {e}"),
            )),
        }
    }

    /// Handle one decoded JSON-RPC message. Notifications produce `None`.
    pub async fn handle_value(&self, value: Value) -> Option<Value> {
        let request = match parse_jsonrpc_request(&value) {
            Ok(request) => request,
            Err(error) => return Some(error.into_frame()),
        };

        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "Received MCP notification");
            return None;
        };

        tracing::debug!(method = %request.method, "Handling MCP request");
        let frame = match self.dispatch(&request, &id).await {
            Ok(result) => jsonrpc_result_frame(id, result),
            Err(error) => {
                tracing::debug!(code = error.code, "MCP request failed: {}", error.message);
                error.into_frame()
            }
        };
        Some(frame)
    }

    async fn dispatch(
        &self,
        request: &McpJsonRpcRequest,
        id: &Value,
    ) -> Result<Value, McpDispatchError> {
        match request.method.as_str() {
            "initialize" => Ok(handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(&request.params, id).await,
            "prompts/list" => Ok(handle_prompts_list()),
            "prompts/get" => handle_prompts_get(&request.params, id),
            other => Err(McpDispatchError::new(
                id.clone(),
                MCP_ERROR_METHOD_NOT_FOUND,
                format!("unsupported method '{}'", other),
            )),
        }
    }

    fn handle_tools_list(&self) -> Value {
        json!({
            "tools": self
                .registry
                .list()
                .into_iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "inputSchema": tool.parameters
                    })
                })
                .collect::<Vec<_>>()
        })
    }

    async fn handle_tools_call(
        &self,
        params: &Map<String, Value>,
        id: &Value,
    ) -> Result<Value, McpDispatchError> {
        let invalid = |message: &str| {
            McpDispatchError::new(id.clone(), MCP_ERROR_INVALID_PARAMS, message)
        };
        let tool_name = params
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| invalid("tools/call requires non-empty field 'name'"))?;
        let arguments = match params.get("arguments") {
            Some(Value::Object(arguments)) => Value::Object(arguments.clone()),
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(_) => {
                return Err(invalid(
                    "tools/call field 'arguments' must be an object when provided",
                ));
            }
        };

        match self.registry.execute(tool_name, arguments).await {
            Ok(output) => {
                let is_error = output.is_error();
                Ok(mcp_tool_call_result(output.result, is_error))
            }
            Err(ToolError::NotFound(name)) => Err(invalid(&format!("unknown tool '{}'", name))),
            Err(e) => Ok(mcp_tool_call_result(
                json!({ "ok": false, "error": e.to_string() }),
                true,
            )),
        }
    }
}

fn parse_jsonrpc_request(value: &Value) -> Result<McpJsonRpcRequest, McpDispatchError> {
    let Some(object) = value.as_object() else {
        return Err(McpDispatchError::new(
            Value::Null,
            MCP_ERROR_INVALID_REQUEST,
            "jsonrpc request must be an object",
        ));
    };
    let id = object.get("id").cloned();
    let error_id = id.clone().unwrap_or(Value::Null);
    let jsonrpc = object
        .get("jsonrpc")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if jsonrpc != MCP_JSONRPC_VERSION {
        return Err(McpDispatchError::new(
            error_id,
            MCP_ERROR_INVALID_REQUEST,
            format!("jsonrpc must be '{}'", MCP_JSONRPC_VERSION),
        ));
    }
    let method = object
        .get("method")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            McpDispatchError::new(
                error_id.clone(),
                MCP_ERROR_INVALID_REQUEST,
                "jsonrpc request must include non-empty method",
            )
        })?;
    let params = match object.get("params") {
        Some(Value::Object(params)) => params.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(_) => {
            return Err(McpDispatchError::new(
                error_id,
                MCP_ERROR_INVALID_PARAMS,
                "jsonrpc request params must be an object",
            ));
        }
    };
    Ok(McpJsonRpcRequest {
        id,
        method: method.to_string(),
        params,
    })
}

fn handle_initialize() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "serverInfo": {
            "name": MCP_SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "capabilities": {
            "tools": {
                "listChanged": false
            },
            "prompts": {
                "listChanged": false
            }
        }
    })
}

fn handle_prompts_list() -> Value {
    json!({
        "prompts": usage_prompts()
            .into_iter()
            .map(|prompt| {
                json!({
                    "name": prompt.name,
                    "description": prompt.description,
                    "arguments": []
                })
            })
            .collect::<Vec<_>>()
    })
}

fn handle_prompts_get(params: &Map<String, Value>, id: &Value) -> Result<Value, McpDispatchError> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            McpDispatchError::new(
                id.clone(),
                MCP_ERROR_INVALID_PARAMS,
                "prompts/get requires non-empty field 'name'",
            )
        })?;
    let prompt = find_prompt(name).ok_or_else(|| {
        McpDispatchError::new(
            id.clone(),
            MCP_ERROR_INVALID_PARAMS,
            format!("unknown prompt '{}'", name),
        )
    })?;
    Ok(json!({
        "description": prompt.description,
        "messages": [{
            "role": "user",
            "content": {
                "type": MCP_CONTENT_TYPE_TEXT,
                "text": render_prompt(&prompt)
            }
        }]
    }))
}

fn mcp_tool_call_result(content: Value, is_error: bool) -> Value {
    let text = serde_json::to_string_pretty(&content)
        .unwrap_or_else(|_| "{\"error\":\"failed to serialize tool result\"}".to_string());
    json!({
        "content": [{
            "type": MCP_CONTENT_TYPE_TEXT,
            "text": text
        }],
        "isError": is_error,
        "structuredContent": content,
    })
}

pub fn jsonrpc_result_frame(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": MCP_JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

pub fn jsonrpc_error_frame(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": MCP_JSONRPC_VERSION,
        "id": id,
        "error": {
            "code": code,
            "message": message.into(),
        }
    })
}
