use std::str::FromStr;

use crate::config::helpers::{optional_env, parse_list, parse_optional_env};
use crate::error::ConfigError;

/// Webhook listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl WebhookConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: optional_env("WEBHOOK_HOST")?.unwrap_or(defaults.host),
            port: parse_optional_env("WEBHOOK_PORT", defaults.port)?,
        })
    }
}

/// How the MCP server talks to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum McpTransportKind {
    /// Newline-delimited JSON-RPC on stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST at the mount path.
    Http,
}

impl FromStr for McpTransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" | "streamable-http" => Ok(Self::Http),
            other => Err(format!(
                "unknown transport '{other}', expected 'stdio' or 'http'"
            )),
        }
    }
}

impl std::fmt::Display for McpTransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// MCP server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpConfig {
    pub transport: McpTransportKind,
    pub host: String,
    pub port: u16,
    /// Route the HTTP transport is served on.
    pub mount_path: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: McpTransportKind::Stdio,
            host: "0.0.0.0".to_string(),
            port: 8000,
            mount_path: "/mcp".to_string(),
        }
    }
}

impl McpConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mount_path = optional_env("MCP_MOUNT_PATH")?.unwrap_or(defaults.mount_path);
        Ok(Self {
            transport: parse_optional_env("MCP_TRANSPORT", defaults.transport)?,
            host: optional_env("MCP_HOST")?.unwrap_or(defaults.host),
            port: parse_optional_env("MCP_PORT", defaults.port)?,
            mount_path: normalize_mount_path(&mount_path),
        })
    }
}

/// Ensure a mount path starts with `/` and has no trailing slash.
pub fn normalize_mount_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    format!("/{trimmed}")
}

/// CORS settings for the HTTP surfaces. `*` means "any".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: vec!["*".to_string()],
            allow_headers: vec!["*".to_string()],
        }
    }
}

impl CorsConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            allow_origins: list_env("CORS_ALLOW_ORIGINS")?,
            allow_methods: list_env("CORS_ALLOW_METHODS")?,
            allow_headers: list_env("CORS_ALLOW_HEADERS")?,
        })
    }
}

fn list_env(key: &str) -> Result<Vec<String>, ConfigError> {
    let list = optional_env(key)?
        .map(|raw| parse_list(&raw))
        .unwrap_or_default();
    if list.is_empty() {
        Ok(vec!["*".to_string()])
    } else {
        Ok(list)
    }
}
