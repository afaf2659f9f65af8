//! HTTP sender tests against an in-process collector

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use gas_core::collect::EndpointTable;
use gas_core::{HitSender, HttpHitSender, NetworkConfig, Tracker, TrackerSettings, TransportError};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct CollectedHit {
    content_type: Option<String>,
    user_agent: Option<String>,
    body: String,
}

type Collected = Arc<Mutex<Vec<CollectedHit>>>;

async fn collect(
    State(collected): State<Collected>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    collected.lock().push(CollectedHit {
        content_type: header_value(header::CONTENT_TYPE),
        user_agent: header_value(header::USER_AGENT),
        body,
    });
    StatusCode::OK
}

async fn unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn slow() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(5)).await;
    StatusCode::OK
}

async fn start_collector() -> (SocketAddr, Collected) {
    let collected: Collected = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/collect", post(collect))
        .route("/unavailable", post(unavailable))
        .route("/slow", post(slow))
        .with_state(collected.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, collected)
}

fn create_test_network_config() -> NetworkConfig {
    NetworkConfig {
        request_timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_millis(500),
        ..NetworkConfig::default()
    }
}

fn create_tracker(address: SocketAddr, path: &str) -> Tracker<HttpHitSender> {
    let sender = HttpHitSender::new(&create_test_network_config()).unwrap();
    let settings = TrackerSettings::new("UA-XXXX-Y", "555", "example.com", false);
    Tracker::new(settings, sender)
        .unwrap()
        .with_endpoints(EndpointTable::single(format!("http://{address}{path}")))
}

#[tokio::test]
async fn test_hit_is_posted_as_form_body() {
    let (address, collected) = start_collector().await;
    let tracker = create_tracker(address, "/collect");

    let status = tracker
        .track_page_view(None, Some("/"), None)
        .await
        .unwrap();
    assert_eq!(status, 200);

    let hits = collected.lock().clone();
    assert_eq!(hits.len(), 1);
    assert_eq!(
        hits[0].content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(hits[0].user_agent.as_deref(), Some("gas-majestic-1"));
    assert!(hits[0].body.starts_with("v=1&tid=UA-XXXX-Y&cid=555&z="));
    assert!(
        hits[0]
            .body
            .ends_with("&cs=direct&t=pageview&dh=example.com&dp=%2F&dt=%2F")
    );
}

#[tokio::test]
async fn test_non_success_status_is_returned() {
    let (address, collected) = start_collector().await;
    let tracker = create_tracker(address, "/unavailable");

    let status = tracker
        .track_event("video", "play", None, None)
        .await
        .unwrap();
    assert_eq!(status, 503);
    assert!(collected.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_path_status_is_returned() {
    let (address, _collected) = start_collector().await;
    let tracker = create_tracker(address, "/missing");

    let status = tracker.track_exception(None, None).await.unwrap();
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_slow_collector_times_out() {
    let (address, _collected) = start_collector().await;
    let sender = HttpHitSender::new(&create_test_network_config()).unwrap();
    let url = format!("http://{address}/slow");

    let result = sender.send(&url, "v=1".to_string()).await;
    assert!(matches!(result, Err(TransportError::Timeout { url: failed }) if failed == url));
}

#[tokio::test]
async fn test_refused_connection_surfaces_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let tracker = create_tracker(address, "/collect");
    let result = tracker
        .track_social_interaction("like", "facebook", "/home")
        .await;

    assert!(matches!(
        result,
        Err(TransportError::ConnectionFailed { .. })
    ));
    assert_eq!(tracker.client_id(), "555");
}
