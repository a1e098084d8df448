//! Client cache keyed by token and retry mode.
//!
//! One [`ClientManager`] is built in `main` and shared through `Arc` with
//! the webhook, the event consumer and every tool. The cache lock is held
//! across lookup and insert, so a key maps to exactly one client.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use crate::error::ClientError;
use crate::slack::api::SlackApiFactory;
use crate::slack::client::SlackClient;
use crate::slack::credentials::{
    TokenSource, default_token_sources, process_env, resolve_token, token_hint,
};
use crate::slack::retry::RetryPolicy;

/// Cache key: the resolved token and whether the client retries.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientCacheKey {
    token: String,
    retry_mode: bool,
}

impl ClientCacheKey {
    pub fn new(token: impl Into<String>, retry_mode: bool) -> Self {
        Self {
            token: token.into(),
            retry_mode,
        }
    }
}

impl std::fmt::Debug for ClientCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCacheKey")
            .field("token", &token_hint(&self.token))
            .field("retry_mode", &self.retry_mode)
            .finish()
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

struct ManagerState {
    clients: HashMap<ClientCacheKey, Arc<SlackClient>>,
    retry_count: u32,
}

/// Hands out cached [`SlackClient`]s.
pub struct ClientManager {
    factory: Arc<dyn SlackApiFactory>,
    sources: Vec<TokenSource>,
    lookup: EnvLookup,
    /// Template for retry-enabled clients; `max_retries` comes from the state.
    base_policy: RetryPolicy,
    state: Mutex<ManagerState>,
}

impl ClientManager {
    /// Manager resolving tokens from `SLACK_BOT_TOKEN` / `SLACK_TOKEN`.
    pub fn new(factory: Arc<dyn SlackApiFactory>, base_policy: RetryPolicy) -> Self {
        Self {
            factory,
            sources: default_token_sources(),
            lookup: Arc::new(process_env),
            state: Mutex::new(ManagerState {
                clients: HashMap::new(),
                retry_count: base_policy.max_retries,
            }),
            base_policy,
        }
    }

    /// Replace the ordered token sources consulted after an explicit token.
    pub fn with_token_sources(mut self, sources: Vec<TokenSource>) -> Self {
        self.sources = sources;
        self
    }

    /// Replace the environment lookup used by [`TokenSource::Env`].
    pub fn with_env_lookup<L>(mut self, lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Arc::new(lookup);
        self
    }

    fn resolve(&self, token: Option<&str>) -> Result<SecretString, ClientError> {
        resolve_token(token, &self.sources, |name| (self.lookup)(name)).ok_or_else(|| {
            let sources = self
                .sources
                .iter()
                .map(TokenSource::label)
                .collect::<Vec<_>>()
                .join(", ");
            ClientError::CredentialMissing { sources }
        })
    }

    /// Whether a token can be resolved without an explicit argument.
    pub fn has_default_token(&self) -> bool {
        self.resolve(None).is_ok()
    }

    /// Get (or build and cache) the client for `token` and `use_retry`.
    ///
    /// A missing or empty `token` falls back to the configured sources.
    pub async fn get_client(
        &self,
        token: Option<&str>,
        use_retry: bool,
    ) -> Result<Arc<SlackClient>, ClientError> {
        let token = self.resolve(token)?;
        let key = ClientCacheKey::new(token.expose_secret(), use_retry);

        let mut state = self.state.lock().await;
        if let Some(client) = state.clients.get(&key) {
            return Ok(Arc::clone(client));
        }

        let hint = token_hint(token.expose_secret());
        let api = self.factory.build(token);
        let client = if use_retry {
            let policy = self.base_policy.clone().with_max_retries(state.retry_count);
            tracing::info!(
                token = %hint,
                max_retries = policy.max_retries,
                "Creating Slack client with retry"
            );
            SlackClient::with_retry(api, policy, hint)
        } else {
            tracing::info!(token = %hint, "Creating Slack client");
            SlackClient::plain(api, hint)
        };

        let client = Arc::new(client);
        state.clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Change the retry bound for future clients. Clears the cache.
    pub async fn set_retry_count(&self, retry_count: i64) -> Result<(), ClientError> {
        if retry_count < 0 {
            return Err(ClientError::InvalidArgument(
                "Retry count must be non-negative".to_string(),
            ));
        }
        let count = u32::try_from(retry_count).map_err(|_| {
            ClientError::InvalidArgument(format!(
                "Retry count must be at most {}, got {retry_count}",
                u32::MAX
            ))
        })?;

        let mut state = self.state.lock().await;
        state.retry_count = count;
        state.clients.clear();
        tracing::info!(retry_count = count, "Updated Slack retry count, cleared client cache");
        Ok(())
    }

    /// Current retry bound for retry-enabled clients.
    pub async fn retry_count(&self) -> u32 {
        self.state.lock().await.retry_count
    }

    /// Drop every cached client.
    pub async fn clear_clients(&self) {
        let mut state = self.state.lock().await;
        let dropped = state.clients.len();
        state.clients.clear();
        tracing::debug!(dropped, "Cleared Slack client cache");
    }

    /// Insert or overwrite the cached client for `(token, retry_mode)`.
    pub async fn replace_client(
        &self,
        token: &str,
        client: Arc<SlackClient>,
        retry_mode: bool,
    ) -> Result<(), ClientError> {
        if token.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "Token cannot be empty".to_string(),
            ));
        }
        if client.uses_retry() != retry_mode {
            return Err(ClientError::TypeMismatch {
                expected: mode_name(retry_mode),
                actual: mode_name(client.uses_retry()),
            });
        }

        let key = ClientCacheKey::new(token, retry_mode);
        self.state.lock().await.clients.insert(key, client);
        tracing::debug!(token = %token_hint(token), retry_mode, "Replaced cached Slack client");
        Ok(())
    }

    /// Number of cached clients.
    pub async fn cached_count(&self) -> usize {
        self.state.lock().await.clients.len()
    }
}

fn mode_name(retry_mode: bool) -> &'static str {
    if retry_mode { "retrying" } else { "plain" }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::testing::{RecordingApi, StubApiFactory};

    fn manager_with_env(vars: &'static [(&'static str, &'static str)]) -> (ClientManager, Arc<StubApiFactory>) {
        let api = Arc::new(RecordingApi::ok(json!({"ok": true})));
        let factory = Arc::new(StubApiFactory::new(api));
        let policy = RetryPolicy::new(3, Duration::from_millis(10), 2.0, 0.0).unwrap();
        let manager = ClientManager::new(factory.clone(), policy).with_env_lookup(move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        });
        (manager, factory)
    }

    #[tokio::test]
    async fn test_same_key_returns_same_instance() {
        let (manager, factory) = manager_with_env(&[]);

        let a = manager.get_client(Some("xoxb-one"), true).await.unwrap();
        let b = manager.get_client(Some("xoxb-one"), true).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.build_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_mode_is_part_of_key() {
        let (manager, _factory) = manager_with_env(&[]);

        let retrying = manager.get_client(Some("xoxb-one"), true).await.unwrap();
        let plain = manager.get_client(Some("xoxb-one"), false).await.unwrap();

        assert!(!Arc::ptr_eq(&retrying, &plain));
        assert!(retrying.uses_retry());
        assert!(!plain.uses_retry());
    }

    #[tokio::test]
    async fn test_env_token_fallback() {
        let (manager, factory) = manager_with_env(&[("SLACK_TOKEN", "xoxb-fallback")]);

        manager.get_client(None, false).await.unwrap();
        assert_eq!(factory.built_tokens(), vec!["xoxb-fallback".to_string()]);
    }

    #[tokio::test]
    async fn test_explicit_and_env_token_share_cache_entry() {
        let (manager, _factory) = manager_with_env(&[("SLACK_BOT_TOKEN", "xoxb-env")]);

        let implicit = manager.get_client(None, false).await.unwrap();
        let explicit = manager.get_client(Some("xoxb-env"), false).await.unwrap();
        assert!(Arc::ptr_eq(&implicit, &explicit));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_and_caches_nothing() {
        let (manager, factory) = manager_with_env(&[("SLACK_BOT_TOKEN", "")]);

        let err = manager.get_client(Some(""), true).await.unwrap_err();
        assert!(matches!(err, ClientError::CredentialMissing { .. }));
        assert!(err.to_string().contains("SLACK_BOT_TOKEN"));
        assert_eq!(manager.cached_count().await, 0);
        assert_eq!(factory.build_count(), 0);
    }

    #[tokio::test]
    async fn test_negative_retry_count_rejected_cache_untouched() {
        let (manager, _factory) = manager_with_env(&[]);
        let before = manager.get_client(Some("xoxb-one"), true).await.unwrap();

        let err = manager.set_retry_count(-1).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::InvalidArgument("Retry count must be non-negative".to_string())
        );
        assert_eq!(manager.retry_count().await, 3);

        let after = manager.get_client(Some("xoxb-one"), true).await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_oversized_retry_count_has_its_own_message() {
        let (manager, _factory) = manager_with_env(&[]);

        let err = manager
            .set_retry_count(i64::from(u32::MAX) + 1)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::InvalidArgument(format!(
                "Retry count must be at most {}, got {}",
                u32::MAX,
                i64::from(u32::MAX) + 1
            ))
        );
        assert_eq!(manager.retry_count().await, 3);
    }

    #[tokio::test]
    async fn test_set_retry_count_clears_and_rebuilds() {
        let (manager, factory) = manager_with_env(&[]);
        let before = manager.get_client(Some("xoxb-one"), true).await.unwrap();
        manager.get_client(Some("xoxb-one"), false).await.unwrap();

        manager.set_retry_count(5).await.unwrap();
        assert_eq!(manager.cached_count().await, 0);

        let after = manager.get_client(Some("xoxb-one"), true).await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.retry_policy().map(|p| p.max_retries), Some(5));
        assert_eq!(factory.build_count(), 3);
    }

    #[tokio::test]
    async fn test_clear_clients() {
        let (manager, _factory) = manager_with_env(&[]);
        let before = manager.get_client(Some("xoxb-one"), false).await.unwrap();

        manager.clear_clients().await;
        assert_eq!(manager.cached_count().await, 0);

        let after = manager.get_client(Some("xoxb-one"), false).await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_replace_client() {
        let (manager, factory) = manager_with_env(&[]);
        let api = Arc::new(RecordingApi::ok(json!({"ok": true})));
        let custom = Arc::new(SlackClient::plain(api, "...mine"));

        manager
            .replace_client("xoxb-one", custom.clone(), false)
            .await
            .unwrap();

        let got = manager.get_client(Some("xoxb-one"), false).await.unwrap();
        assert!(Arc::ptr_eq(&got, &custom));
        assert_eq!(factory.build_count(), 0);
    }

    #[tokio::test]
    async fn test_replace_client_validation() {
        let (manager, _factory) = manager_with_env(&[]);
        let api = Arc::new(RecordingApi::ok(json!({"ok": true})));
        let plain = Arc::new(SlackClient::plain(api, "...mine"));

        let err = manager
            .replace_client("  ", plain.clone(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));

        let err = manager
            .replace_client("xoxb-one", plain, true)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::TypeMismatch {
                expected: "retrying",
                actual: "plain",
            }
        );
        assert_eq!(manager.cached_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_get_client_builds_once() {
        let (manager, factory) = manager_with_env(&[]);
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.get_client(Some("xoxb-one"), true).await })
            })
            .collect();

        let mut clients = Vec::new();
        for handle in handles {
            clients.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(factory.build_count(), 1);
        assert!(clients.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
