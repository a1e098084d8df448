//! CLI definition.
//!
//! Provides subcommands for:
//! - Serving the MCP tools (`mcp`), over stdio or HTTP
//! - Serving the Slack Events API webhook (`webhook`)
//!
//! Either command takes `--integrated` to serve the webhook routes and the
//! MCP endpoint from a single HTTP listener.

use std::path::{Path, PathBuf};

use clap::{ColorChoice, Parser, Subcommand, ValueEnum};

use crate::config::{Config, McpTransportKind, normalize_mount_path};

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_LOG_FILTER: &str = "slack_mcp=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "slack-mcp")]
#[command(about = "Slack MCP tool server and Events API webhook")]
#[command(
    long_about = "Serves Slack tools to MCP clients and handles Slack Events API callbacks.\nExamples:\n  slack-mcp mcp  # MCP over stdio\n  slack-mcp mcp --transport http --port 8000\n  slack-mcp webhook --integrated  # webhook + MCP on one port"
)]
#[command(version)]
#[command(color = ColorChoice::Auto)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Env file to load before reading configuration (default: .env)
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Do not load any env file
    #[arg(long, global = true, conflicts_with = "env_file")]
    pub no_env_file: bool,

    /// Slack bot token, used when SLACK_BOT_TOKEN and SLACK_TOKEN are unset
    #[arg(long, global = true)]
    pub slack_token: Option<String>,

    /// Maximum retries for rate-limited Slack calls (overrides SLACK_RETRY_COUNT)
    #[arg(long, global = true)]
    pub retry: Option<u32>,

    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    /// RUST_LOG takes precedence.
    #[arg(long, global = true, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the Slack tools over MCP
    #[command(
        about = "Run the MCP server",
        long_about = "Serves the Slack tools and usage prompts over MCP.\nExamples:\n  slack-mcp mcp\n  slack-mcp mcp --transport http --integrated"
    )]
    Mcp(McpArgs),

    /// Serve the Slack Events API webhook
    #[command(
        about = "Run the webhook server",
        long_about = "Receives Slack events on POST /slack/events and answers mentions and reactions.\nExample: slack-mcp webhook --port 3000"
    )]
    Webhook(WebhookArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct McpArgs {
    /// Transport: stdio or http (overrides MCP_TRANSPORT)
    #[arg(long)]
    pub transport: Option<McpTransportKind>,

    /// Bind host for the http transport (overrides MCP_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port for the http transport (overrides MCP_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Path of the MCP endpoint (overrides MCP_MOUNT_PATH)
    #[arg(long)]
    pub mount_path: Option<String>,

    /// Also serve the webhook routes on the MCP listener (http only)
    #[arg(long)]
    pub integrated: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct WebhookArgs {
    /// Bind host (overrides WEBHOOK_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides WEBHOOK_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Also serve the MCP endpoint on the webhook listener
    #[arg(long)]
    pub integrated: bool,

    /// Path of the MCP endpoint in integrated mode (overrides MCP_MOUNT_PATH)
    #[arg(long)]
    pub mount_path: Option<String>,
}

impl Cli {
    /// The env file to load, and whether it must exist.
    pub fn env_file(&self) -> Option<(&Path, bool)> {
        if self.no_env_file {
            return None;
        }
        match &self.env_file {
            Some(path) => Some((path.as_path(), true)),
            None => Some((Path::new(DEFAULT_ENV_FILE), false)),
        }
    }

    /// Tracing filter for the `--log-level` value when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> String {
        match self.log_level.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_LOG_FILTER.to_string(),
            Some(directive) if directive.contains('=') || directive.contains(',') => {
                directive.to_string()
            }
            Some(level) => {
                let level = level.to_ascii_lowercase();
                format!("slack_mcp={level},tower_http={level}")
            }
        }
    }

    /// Apply command-line overrides on top of the environment configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(retry) = self.retry {
            config.retry.max_retries = retry;
        }
        match &self.command {
            Command::Mcp(args) => {
                if let Some(transport) = args.transport {
                    config.mcp.transport = transport;
                }
                if let Some(host) = &args.host {
                    config.mcp.host = host.clone();
                }
                if let Some(port) = args.port {
                    config.mcp.port = port;
                }
                if let Some(path) = &args.mount_path {
                    config.mcp.mount_path = normalize_mount_path(path);
                }
            }
            Command::Webhook(args) => {
                if let Some(host) = &args.host {
                    config.webhook.host = host.clone();
                }
                if let Some(port) = args.port {
                    config.webhook.port = port;
                }
                if let Some(path) = &args.mount_path {
                    config.mcp.mount_path = normalize_mount_path(path);
                }
            }
        }
    }
}
