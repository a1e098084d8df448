//! Tools exposed over MCP.
//!
//! - [`tool`]: the `Tool` trait, parameter helpers and schema checks
//! - [`registry`]: name lookup and timed execution
//! - [`slack`]: the Slack Web API tools
//! - [`prompts`]: per-tool usage guides

pub mod prompts;
pub mod redaction;
pub mod registry;
pub mod slack;
pub mod tool;

pub use prompts::{UsagePrompt, find_prompt, render_prompt, usage_prompts};
pub use registry::ToolRegistry;
pub use slack::register_slack_tools;
pub use tool::{Tool, ToolError, ToolOutput, ToolSchema, validate_tool_schema};
