//! Slack Web API access.
//!
//! - [`api`]: the raw transport and its `reqwest` implementation
//! - [`retry`]: rate-limit aware retry wrapper
//! - [`credentials`]: token resolution
//! - [`client`]: token-bound client with typed method helpers
//! - [`manager`]: the client cache shared across the process

pub mod api;
pub mod client;
pub mod credentials;
pub mod manager;
pub mod retry;

pub use api::{HttpSlackApi, HttpSlackApiFactory, SlackApi, SlackApiFactory};
pub use client::{HistoryQuery, SlackClient};
pub use credentials::{TokenSource, resolve_token, token_hint};
pub use manager::{ClientCacheKey, ClientManager};
pub use retry::{MAX_BACKOFF, RetryPolicy, with_retry};
