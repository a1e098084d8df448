//! Slack MCP server and Events API webhook.
//!
//! - [`slack`]: token-keyed client cache, retry/backoff, Web API transport
//! - [`webhook`]: request signing, event routing and the built-in handlers
//! - [`queue`]: hand-off between the webhook and the event consumer
//! - [`tools`] / [`mcp`]: Slack tools served over MCP
//! - [`config`] / [`cli`] / [`server`]: process wiring

pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;
pub mod queue;
pub mod server;
pub mod slack;
pub mod testing;
pub mod tools;
pub mod webhook;
