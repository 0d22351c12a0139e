// Integration tests for `HttpFetcher` using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use telesync_api::{Channel, Error, Fetcher, HttpFetcher, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HttpFetcher) {
    let server = MockServer::start().await;
    let fetcher = HttpFetcher::new(server.uri().parse().unwrap(), &TransportConfig::default())
        .unwrap();
    (server, fetcher)
}

fn sample_body() -> serde_json::Value {
    json!({
        "battery_data": [
            { "id": 12, "timestamp": "2025-03-01 10:00:04", "battery_volt": 52.0, "battery_current": 7.9 },
            { "id": 11, "timestamp": "2025-03-01 10:00:02", "battery_volt": 52.2, "battery_current": 8.0 }
        ],
        "motor_data": [
            { "id": 5, "timestamp": "2025-03-01 10:00:04", "motor_current": 11.2, "motor_temp": 40.1 }
        ],
        "mppt_data": [],
        "vehicle_data": [
            { "id": 9, "timestamp": "2025-03-01 10:00:03", "speed": 36 }
        ]
    })
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_snapshot_with_limit() {
    let (server, fetcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = fetcher.fetch(20).await.unwrap();

    assert_eq!(snapshot.len(Channel::Battery), 2);
    assert_eq!(snapshot.len(Channel::Motor), 1);
    assert_eq!(snapshot.len(Channel::Mppt), 0);
    assert_eq!(snapshot.len(Channel::Vehicle), 1);
    assert_eq!(snapshot.total_points(), 4);
    assert_eq!(snapshot.battery_data[0].field("id"), Some(&json!(12)));
}

#[tokio::test]
async fn test_fetch_passes_custom_limit() {
    let (server, fetcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = fetcher.fetch(5).await.unwrap();
    assert!(!snapshot.has_data());
}

// ── Error paths ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_carries_message() {
    let (server, fetcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "database unavailable" })),
        )
        .mount(&server)
        .await;

    let err = fetcher.fetch(20).await.unwrap_err();
    match err {
        Error::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message.as_deref(), Some("database unavailable"));
        }
        other => panic!("expected Server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_without_body() {
    let (server, fetcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = fetcher.fetch(20).await.unwrap_err();
    assert!(matches!(err, Error::Server { status: 502, message: None }));
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, fetcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = fetcher.fetch(20).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    let transport = TransportConfig::default().with_timeout(Duration::from_millis(100));
    let fetcher = HttpFetcher::new(server.uri().parse().unwrap(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(sample_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = fetcher.fetch(20).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Bind then drop a listener to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::new(
        format!("http://{addr}").parse().unwrap(),
        &TransportConfig::default(),
    )
    .unwrap();

    let err = fetcher.fetch(20).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    assert!(err.is_transient());
}
