//! End-to-end webhook tests: signed HTTP request in, Slack API call out.
//!
//! The router is driven with `tower::ServiceExt::oneshot`; Slack itself is
//! a `RecordingApi`, so every outbound call can be asserted on.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use slack_mcp::queue::{EventConsumer, MemoryBackend, QueueBackend};
use slack_mcp::slack::{ClientManager, RetryPolicy};
use slack_mcp::testing::{RecordingApi, StubApiFactory};
use slack_mcp::webhook::{EventDispatcher, WebhookState, sign_slack_request, webhook_router};

const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
const TOPIC: &str = "slack_events";

struct Harness {
    app: Router,
    queue: Arc<MemoryBackend>,
    consumer: Arc<EventConsumer>,
    api: Arc<RecordingApi>,
}

fn harness(api: RecordingApi, bot_id: Option<&str>) -> Harness {
    harness_with_queue(api, bot_id, MemoryBackend::new())
}

fn harness_with_queue(api: RecordingApi, bot_id: Option<&str>, queue: MemoryBackend) -> Harness {
    let api = Arc::new(api);
    let clients = Arc::new(
        ClientManager::new(
            Arc::new(StubApiFactory::new(api.clone())),
            RetryPolicy::default(),
        )
        .with_env_lookup(|name| (name == "SLACK_BOT_TOKEN").then(|| "xoxb-test".to_string())),
    );
    let queue = Arc::new(queue);
    let dispatcher = Arc::new(EventDispatcher::new(
        clients.clone(),
        bot_id.map(String::from),
    ));
    let consumer = Arc::new(EventConsumer::new(
        queue.clone() as Arc<dyn QueueBackend>,
        dispatcher,
        TOPIC,
    ));
    let state = WebhookState::new(
        Some(SecretString::from(SECRET.to_string())),
        queue.clone() as Arc<dyn QueueBackend>,
        TOPIC,
        clients,
    );
    Harness {
        app: webhook_router(state),
        queue,
        consumer,
        api,
    }
}

fn now() -> String {
    chrono::Utc::now().timestamp().to_string()
}

fn signed_request(body: &str, timestamp: &str) -> Request<Body> {
    let signature = sign_slack_request(SECRET, timestamp, body.as_bytes()).unwrap();
    Request::post("/slack/events")
        .header("content-type", "application/json")
        .header("x-slack-request-timestamp", timestamp)
        .header("x-slack-signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Close the queue and let the consumer drain everything already published.
async fn drain(h: &Harness) {
    h.queue.close().await;
    tokio::time::timeout(Duration::from_secs(5), h.consumer.run())
        .await
        .expect("consumer should drain a closed queue");
}

#[tokio::test]
async fn url_verification_echoes_challenge() {
    let h = harness(RecordingApi::ok(json!({"ok": true})), None);
    let body = json!({"type": "url_verification", "challenge": "abc123"}).to_string();

    let (status, response) = send(&h.app, signed_request(&body, &now())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"challenge": "abc123"}));
}

#[tokio::test]
async fn bad_signature_is_rejected() {
    let h = harness(RecordingApi::ok(json!({"ok": true})), None);
    let body = json!({"type": "url_verification", "challenge": "abc123"}).to_string();
    let request = Request::post("/slack/events")
        .header("x-slack-request-timestamp", now())
        .header("x-slack-signature", "v0=deadbeef")
        .body(Body::from(body))
        .unwrap();

    let (status, response) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response, json!({"error": "Invalid request signature"}));
}

#[tokio::test]
async fn stale_timestamp_is_rejected() {
    let h = harness(RecordingApi::ok(json!({"ok": true})), None);
    let body = json!({"type": "url_verification", "challenge": "abc123"}).to_string();
    let stale = (chrono::Utc::now().timestamp() - 600).to_string();

    let (status, _) = send(&h.app, signed_request(&body, &stale)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_headers_are_rejected() {
    let h = harness(RecordingApi::ok(json!({"ok": true})), None);
    let request = Request::post("/slack/events")
        .body(Body::from("{}"))
        .unwrap();

    let (status, _) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_garbage_is_bad_request() {
    let h = harness(RecordingApi::ok(json!({"ok": true})), None);

    let (status, response) = send(&h.app, signed_request("not json", &now())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, json!({"error": "Invalid JSON payload"}));
}

#[tokio::test]
async fn app_mention_is_answered_in_thread() {
    let h = harness(RecordingApi::ok(json!({"ok": true, "ts": "2.0"})), None);
    let body = json!({
        "type": "event_callback",
        "event_id": "Ev1",
        "event": {
            "type": "app_mention",
            "user": "U1",
            "text": "<@UBOT> hello",
            "ts": "1700000000.000100",
            "channel": "C1"
        }
    })
    .to_string();

    let (status, response) = send(&h.app, signed_request(&body, &now())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"status": "ok"}));

    drain(&h).await;

    assert_eq!(
        h.api.calls_to("chat.postMessage"),
        vec![json!({
            "channel": "C1",
            "text": "You said: hello",
            "thread_ts": "1700000000.000100"
        })]
    );
}

#[tokio::test]
async fn reaction_on_bot_message_gets_thanks() {
    let api = RecordingApi::ok(json!({"ok": true})).respond(
        "conversations.history",
        Ok(json!({
            "ok": true,
            "messages": [{"ts": "1.5", "bot_id": "B0BOT", "text": "hi"}]
        })),
    );
    let h = harness(api, Some("B0BOT"));
    let body = json!({
        "type": "event_callback",
        "event": {
            "type": "reaction_added",
            "user": "U2",
            "reaction": "tada",
            "item": {"type": "message", "channel": "C1", "ts": "1.5"}
        }
    })
    .to_string();

    let (status, _) = send(&h.app, signed_request(&body, &now())).await;
    assert_eq!(status, StatusCode::OK);

    drain(&h).await;

    let posts = h.api.calls_to("chat.postMessage");
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts[0]["text"],
        "Thanks for reacting with :tada: to my message!"
    );
    assert_eq!(posts[0]["thread_ts"], "1.5");
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged_and_dropped() {
    let h = harness(RecordingApi::ok(json!({"ok": true})), None);
    let body = json!({
        "type": "event_callback",
        "event": {"type": "channel_created", "channel": {"id": "C9"}}
    })
    .to_string();

    let (status, _) = send(&h.app, signed_request(&body, &now())).await;
    assert_eq!(status, StatusCode::OK);

    drain(&h).await;
    assert_eq!(h.api.call_count(), 0);
}

#[tokio::test]
async fn closed_queue_returns_service_unavailable() {
    let h = harness(RecordingApi::ok(json!({"ok": true})), None);
    h.queue.close().await;
    let body = json!({"type": "event_callback", "event": {"type": "app_mention"}}).to_string();

    let (status, response) = send(&h.app, signed_request(&body, &now())).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response, json!({"error": "Event queue unavailable"}));
}

#[tokio::test]
async fn full_queue_answers_promptly_with_service_unavailable() {
    let h = harness_with_queue(
        RecordingApi::ok(json!({"ok": true})),
        None,
        MemoryBackend::with_capacity(1),
    );
    let body = json!({"type": "event_callback", "event": {"type": "app_mention"}}).to_string();

    let (status, _) = send(&h.app, signed_request(&body, &now())).await;
    assert_eq!(status, StatusCode::OK);

    // Nothing drains the queue, so the next event finds it full.
    let (status, response) = tokio::time::timeout(
        Duration::from_secs(3),
        send(&h.app, signed_request(&body, &now())),
    )
    .await
    .expect("webhook must not wait for queue space");

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response, json!({"error": "Event queue unavailable"}));
}

#[tokio::test]
async fn health_reports_components() {
    let h = harness(RecordingApi::ok(json!({"ok": true})), None);
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let (status, response) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response,
        json!({
            "status": "healthy",
            "service": "slack-webhook-server",
            "components": {
                "queue_backend": "memory: healthy",
                "slack_client": "configured"
            }
        })
    );

    h.queue.close().await;
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, response) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response["status"], "unhealthy");
}
