//! End-to-end tests for the forwarding pipeline.
//!
//! The email provider is a local mock server; persistence uses the
//! in-memory and `SQLite` stores.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smsrelay_core::{
    AUTH_HINT, Alert, ChannelSource, DeliveryClient, ForwardingConfig, InboundEvent,
    KeyValueStore, MAX_MESSAGES, MemoryStore, MockClock, Notifier, Pipeline, SqliteStore,
    StoreKey,
};

/// Collects alerts for assertions.
#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    fn take(&self) -> Vec<Alert> {
        std::mem::take(&mut *self.alerts.lock().unwrap())
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }
}

fn config() -> ForwardingConfig {
    ForwardingConfig::new("me@example.com", "gateway@example.com", "xkeysib-test")
}

fn client(server: &MockServer) -> DeliveryClient {
    DeliveryClient::new().with_endpoint(format!("{}/v3/smtp/email", server.uri()))
}

async fn accepting_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/smtp/email"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"messageId": "<1@relay>"})))
        .mount(&server)
        .await;
    server
}

/// Starts a configured, enabled pipeline and discards the setup alerts.
async fn running_pipeline(
    store: Arc<dyn KeyValueStore>,
    server: &MockServer,
) -> (Pipeline, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = Pipeline::builder(store)
        .client(client(server))
        .notifier(notifier.clone())
        .clock(Arc::new(MockClock::new(1_700_000_000_000)))
        .start()
        .await;
    pipeline.save_config(config()).await.unwrap();
    pipeline.set_service_enabled(true).await.unwrap();
    notifier.take();
    (pipeline, notifier)
}

#[tokio::test]
async fn accepted_message_is_marked_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/smtp/email"))
        .and(header("api-key", "xkeysib-test"))
        .and(body_partial_json(json!({
            "sender": {"name": "SMS Gateway", "email": "gateway@example.com"},
            "to": [{"email": "me@example.com", "name": "You"}],
            "subject": "📱 SMS from +15551234567",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"messageId": "<1@relay>"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let (pipeline, notifier) = running_pipeline(store.clone(), &server).await;

    let ingested = pipeline
        .ingest(InboundEvent::new("+15551234567", "Your code is 1234"))
        .await
        .unwrap();
    assert!(ingested.delivery.wait().await);

    let messages = pipeline.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_delivered());

    let stored = store.get(StoreKey::Messages).await.unwrap().unwrap();
    assert!(stored.contains(r#""forwarded":true"#));

    let alerts = notifier.take();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Email Forwarded");
}

#[tokio::test]
async fn rejected_key_stays_pending_with_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"code": "unauthorized", "message": "Invalid api-key"})),
        )
        .mount(&server)
        .await;

    let (pipeline, notifier) = running_pipeline(Arc::new(MemoryStore::new()), &server).await;

    let ingested = pipeline
        .ingest(InboundEvent::new("+1555", "hello"))
        .await
        .unwrap();
    assert!(!ingested.delivery.wait().await);
    assert!(!pipeline.messages().await[0].is_delivered());

    let alerts = notifier.take();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].is_error());
    assert_eq!(alerts[0].title, "Email Delivery Error");
    assert_eq!(
        alerts[0].message,
        format!("Invalid api-key\n\nHint: {AUTH_HINT}")
    );
}

#[tokio::test]
async fn server_error_without_body_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (pipeline, notifier) = running_pipeline(Arc::new(MemoryStore::new()), &server).await;
    let ingested = pipeline.ingest(InboundEvent::new("+1", "x")).await.unwrap();
    assert!(!ingested.delivery.wait().await);

    let alerts = notifier.take();
    assert_eq!(alerts[0].message, "HTTP 503");
}

#[tokio::test]
async fn history_keeps_newest_twenty() {
    let server = accepting_server().await;
    let store = Arc::new(MemoryStore::new());
    let (pipeline, _notifier) = running_pipeline(store.clone(), &server).await;

    for i in 0..25 {
        pipeline
            .ingest(InboundEvent::new(format!("+{i}"), format!("message {i}")))
            .await
            .unwrap();
    }
    pipeline.wait_idle().await;

    let messages = pipeline.messages().await;
    assert_eq!(messages.len(), MAX_MESSAGES);
    assert_eq!(messages[0].sender, "+24");
    assert_eq!(messages[MAX_MESSAGES - 1].sender, "+5");
    assert!(messages.iter().all(|m| m.is_delivered()));

    let stored: Vec<serde_json::Value> =
        serde_json::from_str(&store.get(StoreKey::Messages).await.unwrap().unwrap()).unwrap();
    assert_eq!(stored.len(), MAX_MESSAGES);
}

#[tokio::test]
async fn disabled_service_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let (pipeline, notifier) = running_pipeline(Arc::new(MemoryStore::new()), &server).await;
    pipeline.set_service_enabled(false).await.unwrap();
    notifier.take();

    assert!(pipeline.ingest(InboundEvent::new("+1", "x")).await.is_none());
    assert!(pipeline.messages().await.is_empty());
    assert!(notifier.take().is_empty());
}

#[tokio::test]
async fn blank_settings_fall_back_to_stored_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("api-key", "stored-key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store
        .set(StoreKey::ServiceEnabled, "true".into())
        .await
        .unwrap();
    let pipeline = Pipeline::builder(store.clone())
        .client(client(&server))
        .start()
        .await;
    assert!(!pipeline.is_configured());

    // Written after startup, as the background receiver would see it.
    store
        .set(
            StoreKey::Config,
            json!({
                "targetEmail": "me@example.com",
                "smtpEmail": "gateway@example.com",
                "smtpPassword": "  stored-key  ",
            })
            .to_string(),
        )
        .await
        .unwrap();

    let ingested = pipeline.ingest(InboundEvent::new("+1", "x")).await.unwrap();
    assert!(ingested.delivery.wait().await);
}

#[tokio::test]
async fn send_test_bypasses_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"subject": "📱 SMS from TEST"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let (pipeline, notifier) = running_pipeline(Arc::new(MemoryStore::new()), &server).await;
    pipeline.send_test().await.unwrap();

    assert!(pipeline.messages().await.is_empty());
    let titles: Vec<_> = notifier.take().into_iter().map(|a| a.title).collect();
    assert_eq!(titles, ["Sending Test Email", "Email Forwarded", "Test Email Sent"]);
}

#[tokio::test]
async fn source_events_stop_after_close() {
    let server = accepting_server().await;
    let (pipeline, _notifier) = running_pipeline(Arc::new(MemoryStore::new()), &server).await;
    let source = ChannelSource::new();

    pipeline.attach(&source).await;
    assert_eq!(source.emit(&InboundEvent::new("+1", "first")), 1);
    for _ in 0..100 {
        if !pipeline.messages().await.is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }

    pipeline.close().await;
    assert_eq!(source.emit(&InboundEvent::new("+2", "second")), 0);
    pipeline.wait_idle().await;

    let messages = pipeline.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "first");
}

#[tokio::test]
async fn sqlite_state_survives_restart() {
    let server = accepting_server().await;
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::in_memory().await.unwrap());

    {
        let (pipeline, _notifier) = running_pipeline(store.clone(), &server).await;
        let ingested = pipeline.ingest(InboundEvent::new("+1", "persisted")).await.unwrap();
        assert!(ingested.delivery.wait().await);
    }

    let restarted = Pipeline::builder(store).client(client(&server)).start().await;
    assert!(restarted.is_configured());
    assert!(restarted.is_enabled());
    assert_eq!(restarted.config().await, config());

    let messages = restarted.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_delivered());

    let next = restarted.ingest(InboundEvent::new("+2", "later")).await.unwrap();
    assert!(next.id > messages[0].id);
    restarted.wait_idle().await;
}
