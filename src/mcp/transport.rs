//! MCP transports: newline-delimited stdio and JSON-RPC over HTTP POST.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::ServerError;
use crate::mcp::protocol::{MCP_ERROR_PARSE, McpServer, jsonrpc_error_frame};

/// Counters for one stdio session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct McpServeReport {
    pub processed_frames: usize,
    pub error_count: usize,
}

/// Serve JSON-RPC messages, one per line, until `reader` hits EOF.
/// Blank lines are skipped.
pub async fn serve_lines<R, W>(
    server: &McpServer,
    reader: R,
    writer: &mut W,
) -> std::io::Result<McpServeReport>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut report = McpServeReport::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        report.processed_frames = report.processed_frames.saturating_add(1);

        let Some(response) = server.handle_text(line).await else {
            continue;
        };
        if response.get("error").is_some() {
            report.error_count = report.error_count.saturating_add(1);
        }

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }

    Ok(report)
}

/// Serve over the process's stdin/stdout.
pub async fn serve_stdio(server: &McpServer) -> Result<McpServeReport, ServerError> {
    tracing::info!("MCP server reading JSON-RPC from stdin");
    let reader = BufReader::new(tokio::io::stdin());
    let mut writer = tokio::io::stdout();
    let report = serve_lines(server, reader, &mut writer).await?;
    tracing::info!(
        processed = report.processed_frames,
        errors = report.error_count,
        "MCP stdin closed"
    );
    Ok(report)
}

/// `POST {mount_path}` accepting one JSON-RPC message per request.
///
/// Notifications are acknowledged with `202 Accepted` and an empty body.
pub fn mcp_router(server: McpServer, mount_path: &str) -> Router {
    Router::new()
        .route(mount_path, post(mcp_http_handler))
        .with_state(Arc::new(server))
}

async fn mcp_http_handler(State(server): State<Arc<McpServer>>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            let frame = jsonrpc_error_frame(
                Value::Null,
                MCP_ERROR_PARSE,
                format!("failed to parse jsonrpc message: {e}"),
            );
            return (StatusCode::BAD_REQUEST, Json(frame)).into_response();
        }
    };

    match server.handle_value(value).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
