//! Model Context Protocol server.
//!
//! [`protocol`] turns JSON-RPC messages into tool and prompt calls;
//! [`transport`] carries them over stdio or HTTP.

pub mod protocol;
pub mod transport;

pub use protocol::{MCP_PROTOCOL_VERSION, McpServer};
pub use transport::{McpServeReport, mcp_router, serve_lines, serve_stdio};
