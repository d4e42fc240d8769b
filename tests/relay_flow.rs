//! End-to-end relay behavior against a mock processing service.

mod integration;

use integration::mock_server::{relay_for, MockServerFixture};
use neurodrive_relay::relay::Router;
use neurodrive_relay::{Mode, OptionsBag, PartialSettings, ProcessRequest, Settings};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SUMMARY: &str = r#"{"output": "- point one\n- point two", "mode": "summarize"}"#;

#[tokio::test]
async fn second_identical_request_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_process(200, SUMMARY, 1).await;
    let relay = fixture.relay(dir.path());

    let first = relay.process(Mode::Summarize, "A long article about rivers.").await;
    assert!(first.ok, "{:?}", first.error);
    assert!(!first.is_cached());
    let payload = first.payload.unwrap();
    assert_eq!(payload["output"], "- point one\n- point two");
    assert_eq!(first.settings.unwrap().reading_level, "8th grade");

    let second = relay.process(Mode::Summarize, "A long article about rivers.").await;
    assert!(second.ok);
    assert!(second.is_cached());
    let cached = second.payload.unwrap();
    assert_eq!(cached["output"], payload["output"]);
    assert_eq!(cached["cached"], true);

    // Exactly one network call across both requests.
    mock.assert_async().await;
}

#[tokio::test]
async fn stored_payload_is_returned_without_any_post() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_process(200, SUMMARY, 0).await;
    let relay = fixture.relay(dir.path());

    let request = ProcessRequest::new(
        Mode::Summarize,
        "Already summarized.",
        OptionsBag::from(&Settings::default()),
    );
    let key = relay.cache().key(&request);
    relay
        .cache()
        .store(&key, &json!({"output": "- stored"}))
        .await
        .unwrap();

    let env = relay.process(Mode::Summarize, "Already summarized.").await;
    assert!(env.ok);
    assert_eq!(env.cached, Some(true));
    assert_eq!(env.payload.unwrap()["output"], "- stored");
    mock.assert_async().await;
}

#[tokio::test]
async fn cache_survives_a_new_relay_instance() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_process(200, SUMMARY, 1).await;

    let first = fixture.relay(dir.path()).process(Mode::Simplify, "same text").await;
    assert!(first.ok);
    let second = fixture.relay(dir.path()).process(Mode::Simplify, "same text").await;
    assert!(second.is_cached());
    mock.assert_async().await;
}

#[tokio::test]
async fn server_error_is_reported_and_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_process(500, "server error", 2).await;
    let relay = fixture.relay(dir.path());

    for _ in 0..2 {
        let env = relay.process(Mode::Simplify, "hello").await;
        assert!(!env.ok);
        assert!(env.payload.is_none());
        let error = env.error.unwrap();
        assert!(error.contains("500"), "{error}");
        assert!(error.contains("server error"), "{error}");
    }
    assert_eq!(relay.cache().len().await.unwrap(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn changed_settings_produce_a_new_request() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = MockServerFixture::new().await;
    let default_mock = fixture
        .mock_process_matching(
            json!({"mode": "simplify", "options": {"reading_level": "8th grade", "bullets": true}}),
            r#"{"output": "easy"}"#,
        )
        .await;
    let college_mock = fixture
        .mock_process_matching(
            json!({"options": {"reading_level": "college", "simplifier_model": "large"}}),
            r#"{"output": "less easy"}"#,
        )
        .await;
    let relay = fixture.relay(dir.path());

    let env = relay.process(Mode::Simplify, "Dense prose.").await;
    assert_eq!(env.payload.unwrap()["output"], "easy");

    relay
        .settings()
        .set(PartialSettings {
            reading_level: Some("college".into()),
            simplifier_model: Some("large".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let env = relay.process(Mode::Simplify, "Dense prose.").await;
    assert!(!env.is_cached());
    assert_eq!(env.payload.unwrap()["output"], "less easy");
    assert_eq!(env.settings.unwrap().reading_level, "college");

    default_mock.assert_async().await;
    college_mock.assert_async().await;
}

#[tokio::test]
async fn unresponsive_service_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections and never answer.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let client = neurodrive_relay::ApiClient::builder()
        .base_url(format!("http://{addr}"))
        .api_key("k")
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let relay = relay_for(client, dir.path());

    let started = Instant::now();
    let env = relay.process(Mode::Summarize, "anything").await;
    assert!(!env.ok);
    let error = env.error.unwrap();
    assert!(error.contains("timed out"), "{error}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(relay.cache().len().await.unwrap(), 0);
}

#[tokio::test]
async fn unreachable_service_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let client = neurodrive_relay::ApiClient::builder()
        .base_url("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let env = relay_for(client, dir.path()).process(Mode::Simplify, "x").await;
    assert!(!env.ok);
    assert!(env.error.is_some());
}

#[tokio::test]
async fn messages_are_answered_through_the_router() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_process(200, SUMMARY, 1).await;
    let relay = Arc::new(fixture.relay(dir.path()));
    let handle = Router::new(relay).spawn(16);

    let env = handle
        .request(
            json!({"type": "NDH_PROCESS_TEXT", "mode": "summarize", "text": "Some text"}),
            Duration::from_secs(10),
        )
        .await;
    assert!(env.ok);

    let env = handle
        .request(json!({"type": "UNKNOWN_TYPE"}), Duration::from_secs(10))
        .await;
    assert!(!env.ok);
    assert!(env.error.unwrap().contains("UNKNOWN_TYPE"));

    mock.assert_async().await;
}
