//! Configuration for slack-mcp.
//!
//! Everything is read from the process environment, optionally seeded
//! from a `.env` file first (see [`load_env_file`]). Each section has a
//! `resolve()` that reads its own variables so sections stay testable in
//! isolation.

mod retry;
mod server;
mod slack;

use std::path::Path;

pub use retry::RetryConfig;
pub use server::{CorsConfig, McpConfig, McpTransportKind, WebhookConfig, normalize_mount_path};
pub use slack::SlackConfig;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub slack: SlackConfig,
    pub retry: RetryConfig,
    pub webhook: WebhookConfig,
    pub mcp: McpConfig,
    pub cors: CorsConfig,
}

impl Config {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            slack: SlackConfig::resolve()?,
            retry: RetryConfig::resolve()?,
            webhook: WebhookConfig::resolve()?,
            mcp: McpConfig::resolve()?,
            cors: CorsConfig::resolve()?,
        })
    }
}

/// Load variables from an env file into the process environment.
///
/// Values in the file take precedence over variables that are already set,
/// so an explicit `--env-file` always wins. A missing default `.env` is not
/// an error; a missing explicitly requested file is.
pub fn load_env_file(path: &Path, required: bool) -> Result<(), ConfigError> {
    match dotenvy::from_path_override(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Loaded environment file");
            Ok(())
        }
        Err(dotenvy::Error::Io(e)) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(())
        }
        Err(e) => Err(ConfigError::EnvFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

pub(crate) mod helpers {
    use std::str::FromStr;

    use crate::error::ConfigError;

    /// Read an env var, treating unset and blank values as absent.
    pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
        match std::env::var(key) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "value is not valid UTF-8".to_string(),
            }),
        }
    }

    /// Parse an env var with `FromStr`, falling back to `default` when unset.
    pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        optional_env(key)?
            .map(|s| s.trim().parse::<T>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
            .map(|v| v.unwrap_or(default))
    }

    /// Parse a boolean env var. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
    pub(crate) fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = optional_env(key)? else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("must be 'true' or 'false', got '{raw}'"),
            }),
        }
    }

    /// Split a comma-separated list, dropping empty entries.
    pub(crate) fn parse_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::helpers::*;
    use super::test_env::{EnvGuard, lock};
    use super::*;

    #[test]
    fn test_optional_env_blank_is_none() {
        let _lock = lock();
        let _env = EnvGuard::new(&[("SLACK_MCP_TEST_BLANK", Some("   "))]);
        assert_eq!(optional_env("SLACK_MCP_TEST_BLANK").unwrap(), None);
    }

    #[test]
    fn test_parse_optional_env_invalid() {
        let _lock = lock();
        let _env = EnvGuard::new(&[("SLACK_MCP_TEST_PORT", Some("not-a-port"))]);
        let err = parse_optional_env::<u16>("SLACK_MCP_TEST_PORT", 3000).unwrap_err();
        assert!(err.to_string().contains("SLACK_MCP_TEST_PORT"));
    }

    #[test]
    fn test_parse_bool_env_variants() {
        let _lock = lock();
        let _env = EnvGuard::new(&[("SLACK_MCP_TEST_BOOL", Some("Yes"))]);
        assert!(parse_bool_env("SLACK_MCP_TEST_BOOL", false).unwrap());
        drop(_env);
        assert!(!parse_bool_env("SLACK_MCP_TEST_BOOL", false).unwrap());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list("GET, POST,,OPTIONS "),
            vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]
        );
    }

    #[test]
    fn test_load_env_file_overrides_existing() {
        let _lock = lock();
        let _env = EnvGuard::new(&[("SLACK_MCP_TEST_FROM_FILE", Some("process"))]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "SLACK_MCP_TEST_FROM_FILE=file\n").unwrap();

        load_env_file(&path, true).unwrap();
        assert_eq!(std::env::var("SLACK_MCP_TEST_FROM_FILE").unwrap(), "file");
    }

    #[test]
    fn test_load_env_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.env");
        assert!(load_env_file(&path, false).is_ok());
        assert!(matches!(
            load_env_file(&path, true),
            Err(ConfigError::EnvFile { .. })
        ));
    }
}
