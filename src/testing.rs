//! Test doubles for the Slack Web API.
//!
//! Provides:
//! - [`RecordingApi`]: a scripted [`SlackApi`] that records every call
//! - [`StubApiFactory`]: a [`SlackApiFactory`] handing out one shared `RecordingApi`
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use slack_mcp::testing::{RecordingApi, StubApiFactory};
//!
//! let api = Arc::new(RecordingApi::ok(serde_json::json!({"ok": true})));
//! let factory = StubApiFactory::new(api.clone());
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::error::SlackError;
use crate::slack::{SlackApi, SlackApiFactory};

type Reply = Result<Value, SlackError>;

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Scripted Slack API.
///
/// Replies are taken from the per-method queue first, then the shared
/// queue, then the default reply.
pub struct RecordingApi {
    by_method: Mutex<HashMap<String, VecDeque<Reply>>>,
    shared: Mutex<VecDeque<Reply>>,
    default: Reply,
    calls: Mutex<Vec<(String, Value)>>,
    call_count: AtomicU32,
}

impl RecordingApi {
    fn with_default(default: Reply) -> Self {
        Self {
            by_method: Mutex::new(HashMap::new()),
            shared: Mutex::new(VecDeque::new()),
            default,
            calls: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
        }
    }

    /// Every call succeeds with `body`.
    pub fn ok(body: Value) -> Self {
        Self::with_default(Ok(body))
    }

    /// Every call fails with `err`.
    pub fn failing(err: SlackError) -> Self {
        Self::with_default(Err(err))
    }

    /// The first `n` calls are rate limited (no `Retry-After`), then `body`.
    pub fn rate_limited_then_ok(n: u32, body: Value) -> Self {
        let api = Self::ok(body);
        {
            let mut shared = locked(&api.shared);
            for _ in 0..n {
                shared.push_back(Err(SlackError::RateLimited {
                    method: "stub".to_string(),
                    retry_after: Some(Duration::from_millis(1)),
                }));
            }
        }
        api
    }

    /// Queue a reply for the next call to `method`.
    pub fn respond(self, method: &str, reply: Reply) -> Self {
        locked(&self.by_method)
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// All calls so far as `(method, params)`.
    pub fn calls(&self) -> Vec<(String, Value)> {
        locked(&self.calls).clone()
    }

    /// Params of every call to `method`.
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        locked(&self.calls)
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SlackApi for RecordingApi {
    async fn call(&self, method: &str, params: Value) -> Result<Value, SlackError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        locked(&self.calls).push((method.to_string(), params));

        if let Some(reply) = locked(&self.by_method)
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        if let Some(reply) = locked(&self.shared).pop_front() {
            return reply;
        }
        self.default.clone()
    }
}

/// Factory that returns the same [`RecordingApi`] for every token and
/// remembers which tokens it was asked for.
pub struct StubApiFactory {
    api: Arc<RecordingApi>,
    tokens: Mutex<Vec<String>>,
}

impl StubApiFactory {
    pub fn new(api: Arc<RecordingApi>) -> Self {
        Self {
            api,
            tokens: Mutex::new(Vec::new()),
        }
    }

    /// Tokens clients were built for, in order.
    pub fn built_tokens(&self) -> Vec<String> {
        locked(&self.tokens).clone()
    }

    pub fn build_count(&self) -> usize {
        locked(&self.tokens).len()
    }
}

impl SlackApiFactory for StubApiFactory {
    fn build(&self, token: SecretString) -> Arc<dyn SlackApi> {
        locked(&self.tokens).push(token.expose_secret().to_string());
        self.api.clone()
    }
}
