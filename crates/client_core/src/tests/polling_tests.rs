use super::*;
use crate::error::PollErrorKind;
use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use shared::domain::RunId;
use tokio::net::TcpListener;

async fn active_ok() -> Json<serde_json::Value> {
    Json(json!({
        "activeId": "run-7",
        "currentSpeed": 1200.0,
        "totalIterations": 884412
    }))
}

async fn active_negative_speed() -> Json<serde_json::Value> {
    Json(json!({
        "activeId": "run-7",
        "currentSpeed": -3.0,
        "totalIterations": 1
    }))
}

async fn full_ok() -> Json<serde_json::Value> {
    Json(json!({
        "data": {
            "endDate": "2017-03-02T08:00:00.000",
            "totalIterations": 900000,
            "startDate": "2017-03-01T12:00:00.000",
            "sequenceLength": 10
        },
        "links": { "previous": "/bogo/6", "next": null }
    }))
}

async fn garbage() -> &'static str {
    "<html>not json</html>"
}

async fn unavailable() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "try later")
}

async fn slow() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    active_ok().await
}

async fn spawn_status_server() -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/active", get(active_ok))
        .route("/api/active-negative", get(active_negative_speed))
        .route("/api/bogo/7", get(full_ok))
        .route("/api/garbage", get(garbage))
        .route("/api/unavailable", get(unavailable))
        .route("/api/slow", get(slow));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn client_for(base: &str, active_path: &str, full_path: &str, timeout: Duration) -> PollingClient {
    let endpoints = Endpoints {
        active_status: Url::parse(&format!("{base}{active_path}")).expect("active url"),
        full_status: Url::parse(&format!("{base}{full_path}")).expect("full url"),
    };
    PollingClient::new(endpoints, timeout).expect("client")
}

#[tokio::test]
async fn poll_active_decodes_status() {
    let base = spawn_status_server().await.expect("spawn server");
    let client = client_for(&base, "/api/active", "/api/bogo/7", Duration::from_secs(5));

    let status = client.poll_active().await.expect("status");
    assert_eq!(status.active_id, RunId::new("run-7"));
    assert_eq!(status.current_speed, 1200.0);
    assert_eq!(status.total_iterations, 884412);
}

#[tokio::test]
async fn fetch_full_flattens_statistics() {
    let base = spawn_status_server().await.expect("spawn server");
    let client = client_for(&base, "/api/active", "/api/bogo/7", Duration::from_secs(5));

    let stats = client.fetch_full().await.expect("stats");
    assert_eq!(stats.total_iterations, 900000);
    assert_eq!(stats.sequence_length, 10);
    assert!(stats.end_date.is_some());
    assert_eq!(stats.previous_url.as_deref(), Some("/bogo/6"));
    assert!(stats.next_url.is_none());
}

#[tokio::test]
async fn malformed_body_is_protocol_error() {
    let base = spawn_status_server().await.expect("spawn server");
    let client = client_for(&base, "/api/garbage", "/api/garbage", Duration::from_secs(5));

    let err = client.poll_active().await.expect_err("must fail");
    assert_eq!(err.kind(), PollErrorKind::Protocol);
    let err = client.fetch_full().await.expect_err("must fail");
    assert_eq!(err.kind(), PollErrorKind::Protocol);
}

#[tokio::test]
async fn wrong_shape_is_protocol_error() {
    let base = spawn_status_server().await.expect("spawn server");
    let client = client_for(&base, "/api/active-negative", "/api/active", Duration::from_secs(5));

    let err = client.poll_active().await.expect_err("negative speed");
    assert_eq!(err.kind(), PollErrorKind::Protocol);
    let err = client.fetch_full().await.expect_err("active payload is not full stats");
    assert_eq!(err.kind(), PollErrorKind::Protocol);
}

#[tokio::test]
async fn error_status_is_network_error() {
    let base = spawn_status_server().await.expect("spawn server");
    let client = client_for(&base, "/api/unavailable", "/api/unavailable", Duration::from_secs(5));

    let err = client.poll_active().await.expect_err("must fail");
    assert_eq!(err.kind(), PollErrorKind::Network);
    assert!(err.to_string().contains("503"), "unexpected error: {err}");
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = client_for(
        &format!("http://{addr}"),
        "/api/active",
        "/api/bogo/7",
        Duration::from_secs(5),
    );
    let err = client.poll_active().await.expect_err("must fail");
    assert_eq!(err.kind(), PollErrorKind::Network);
}

#[tokio::test]
async fn slow_backend_times_out_as_network_error() {
    let base = spawn_status_server().await.expect("spawn server");
    let client = client_for(&base, "/api/slow", "/api/bogo/7", Duration::from_millis(100));

    let err = client.poll_active().await.expect_err("must time out");
    assert_eq!(err.kind(), PollErrorKind::Network);
}
