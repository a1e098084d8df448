//! Error types for slack-mcp.

use std::time::Duration;

use thiserror::Error;

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load env file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

/// Errors from the credentialed client access layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// No usable token was supplied or found in the environment.
    #[error("Slack token is required but was not provided and {sources} are not set")]
    CredentialMissing {
        /// Human-readable list of the sources that were consulted.
        sources: String,
    },

    /// A configuration input was rejected.
    #[error("{0}")]
    InvalidArgument(String),

    /// A client was supplied for the wrong retry flavour.
    #[error("Expected a {expected} client, got a {actual} client")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors returned by calls to the Slack Web API.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SlackError {
    /// HTTP 429 from Slack. The only variant the retry wrapper retries.
    #[error("Slack rate limited {method} (retry after {retry_after:?})")]
    RateLimited {
        method: String,
        /// Value of the `Retry-After` header, when present.
        retry_after: Option<Duration>,
    },

    /// Slack answered with `"ok": false`.
    #[error("Slack API error calling {method}: {error}")]
    Api { method: String, error: String },

    /// Transport failure, timeout, or a non-2xx status other than 429.
    #[error("HTTP error calling {method}: {reason}")]
    Http { method: String, reason: String },

    /// Response body was not the JSON object Slack promises.
    #[error("Invalid response from {method}: {reason}")]
    InvalidResponse { method: String, reason: String },

    /// Could not obtain a client to make the call with.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl SlackError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Errors raised while handling a routed webhook event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Malformed event payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Slack(#[from] SlackError),
}

/// Errors from the event queue backends.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue backend '{backend}' is closed")]
    Closed { backend: String },

    #[error("Queue backend '{backend}' is full ({capacity} messages)")]
    Full { backend: String, capacity: usize },
}

/// Server startup and runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to start {name} server: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("{name} server error: {reason}")]
    Serve { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
