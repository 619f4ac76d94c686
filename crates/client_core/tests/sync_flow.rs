use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use client_core::{
    AnimationMode, Endpoints, Phase, PollingClient, SyncConfig, SyncController, ViewModel,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::watch};
use url::Url;

#[derive(Clone)]
struct Backend {
    polls: Arc<AtomicUsize>,
    fulls: Arc<AtomicUsize>,
    failing_polls: usize,
    finish_after: usize,
}

async fn active(State(backend): State<Backend>) -> impl IntoResponse {
    let n = backend.polls.fetch_add(1, Ordering::SeqCst) + 1;
    if n <= backend.failing_polls {
        return (StatusCode::BAD_GATEWAY, Json(json!({}))).into_response();
    }
    let active_id = if n > backend.finish_after { 8 } else { 7 };
    Json(json!({
        "activeId": active_id,
        "currentSpeed": 350.6,
        "totalIterations": n * 1000
    }))
    .into_response()
}

async fn full(State(backend): State<Backend>) -> Json<serde_json::Value> {
    backend.fulls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "data": {
            "endDate": "2017-03-02T08:00:00.000",
            "totalIterations": 123456,
            "startDate": "2017-03-01T12:00:00.000",
            "sequenceLength": 16
        },
        "links": { "previous": "/bogo/6", "next": "/bogo/8" }
    }))
}

async fn spawn_backend(backend: Backend) -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/active", get(active))
        .route("/api/bogo/7", get(full))
        .with_state(backend);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn config_for(base: &str) -> SyncConfig {
    let endpoints = Endpoints {
        active_status: Url::parse(&format!("{base}/api/active")).expect("active url"),
        full_status: Url::parse(&format!("{base}/api/bogo/7")).expect("full url"),
    };
    SyncConfig::new(endpoints, "7", 16)
        .with_poll_interval(Duration::from_millis(20))
        .with_backoff(Duration::from_millis(10), Duration::from_millis(40))
        .with_request_timeout(Duration::from_secs(2))
}

async fn wait_for_phase(views: &mut watch::Receiver<ViewModel>, phase: Phase) -> ViewModel {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if views.borrow().phase == phase {
                return views.borrow().clone();
            }
            views.changed().await.expect("controller alive");
        }
    })
    .await
    .expect("phase reached in time")
}

#[tokio::test]
async fn follows_run_from_active_to_sorted_over_http() {
    let backend = Backend {
        polls: Arc::new(AtomicUsize::new(0)),
        fulls: Arc::new(AtomicUsize::new(0)),
        failing_polls: 0,
        finish_after: 3,
    };
    let base = spawn_backend(backend.clone()).await.expect("backend");
    let config = config_for(&base);
    let client = PollingClient::from_config(&config).expect("client");
    let controller = SyncController::start_with_engine(&config, Arc::new(client));
    controller.animation().resize(320.0, 200.0);
    let mut views = controller.subscribe();

    let active = wait_for_phase(&mut views, Phase::Active).await;
    assert_eq!(active.speed_label, "351 shuffles per second");
    assert!(controller.animation().on_frame());

    let sorted = wait_for_phase(&mut views, Phase::Sorted).await;
    assert_eq!(sorted.total_iterations, Some(123456));
    assert_eq!(sorted.next_url.as_deref(), Some("/bogo/8"));
    assert_eq!(controller.animation().mode(), AnimationMode::Settled);

    let polls_at_sort = backend.polls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.polls.load(Ordering::SeqCst), polls_at_sort);
    assert_eq!(backend.fulls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn recovers_after_gateway_errors() {
    let backend = Backend {
        polls: Arc::new(AtomicUsize::new(0)),
        fulls: Arc::new(AtomicUsize::new(0)),
        failing_polls: 2,
        finish_after: usize::MAX,
    };
    let base = spawn_backend(backend.clone()).await.expect("backend");
    let config = config_for(&base);
    let client = PollingClient::from_config(&config).expect("client");
    let controller = SyncController::start_with_engine(&config, Arc::new(client));
    let mut views = controller.subscribe();

    let errored = wait_for_phase(&mut views, Phase::Error).await;
    assert!(errored.error_message.is_some());

    let recovered = wait_for_phase(&mut views, Phase::Active).await;
    assert!(recovered.error_message.is_none());
    assert_eq!(controller.animation().mode(), AnimationMode::Shuffling);

    controller.teardown();
}
