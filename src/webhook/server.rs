//! Events API webhook endpoint.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use bytes::Bytes;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Value, json};

use crate::queue::QueueBackend;
use crate::slack::ClientManager;
use crate::webhook::event::InboundEvent;
use crate::webhook::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER, verify_slack_signature};

pub const SERVICE_NAME: &str = "slack-webhook-server";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    inner: Arc<WebhookStateInner>,
}

struct WebhookStateInner {
    signing_secret: Option<SecretString>,
    queue: Arc<dyn QueueBackend>,
    topic: String,
    clients: Arc<ClientManager>,
}

impl WebhookState {
    pub fn new(
        signing_secret: Option<SecretString>,
        queue: Arc<dyn QueueBackend>,
        topic: impl Into<String>,
        clients: Arc<ClientManager>,
    ) -> Self {
        Self {
            inner: Arc::new(WebhookStateInner {
                signing_secret,
                queue,
                topic: topic.into(),
                clients,
            }),
        }
    }
}

/// Routes: `POST /slack/events`, `GET /health`.
pub fn webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/slack/events", post(slack_events_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn slack_events_handler(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let state = &state.inner;

    let Some(secret) = state.signing_secret.as_ref() else {
        tracing::error!("SLACK_SIGNING_SECRET not set, rejecting Slack request");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid request signature");
    };
    let now_secs = chrono::Utc::now().timestamp();
    if !verify_slack_signature(
        secret.expose_secret(),
        header_str(&headers, SIGNATURE_HEADER),
        header_str(&headers, TIMESTAMP_HEADER),
        &body,
        now_secs,
    ) {
        tracing::warn!("Invalid Slack request signature");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid request signature");
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Rejecting unparseable Slack payload: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload");
        }
    };
    let event: InboundEvent = match serde_json::from_value(payload.clone()) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Rejecting malformed Slack payload: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload");
        }
    };

    if let Some(challenge) = &event.challenge {
        tracing::info!("Answering Slack URL verification challenge");
        return (StatusCode::OK, Json(json!({ "challenge": challenge })));
    }

    tracing::info!(
        event_id = event.event_id.as_deref().unwrap_or("-"),
        event_type = event.event_type().unwrap_or("-"),
        topic = %state.topic,
        "Queueing Slack event"
    );
    if let Err(e) = state.queue.publish(&state.topic, payload).await {
        tracing::error!("Failed to queue Slack event: {}", e);
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Event queue unavailable");
    }

    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    components: HealthComponents,
}

#[derive(Debug, Serialize)]
struct HealthComponents {
    queue_backend: String,
    slack_client: &'static str,
}

async fn health_handler(State(state): State<WebhookState>) -> impl IntoResponse {
    let state = &state.inner;
    let queue_ok = state.queue.is_healthy();
    let queue_backend = if queue_ok {
        format!("{}: healthy", state.queue.name())
    } else {
        format!("{}: closed", state.queue.name())
    };
    let slack_client = if state.clients.has_default_token() {
        "configured"
    } else {
        "not_configured"
    };

    let status_code = if queue_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status_code,
        Json(HealthResponse {
            status: if queue_ok { "healthy" } else { "unhealthy" },
            service: SERVICE_NAME,
            components: HealthComponents {
                queue_backend,
                slack_client,
            },
        }),
    )
}
