//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use dispatcher::{DispatcherConfig, EventDispatcher};
use ledger::{EventLedger, InMemoryLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn fast_config() -> DispatcherConfig {
    DispatcherConfig {
        poll_interval: Duration::from_millis(2),
        batch_size: 16,
        max_attempts: 3,
        base_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    }
}

fn setup() -> (
    axum::Router,
    Arc<api::AppState>,
    EventDispatcher<InMemoryLedger>,
) {
    let (state, dispatcher) = api::create_default_state(fast_config());
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state, dispatcher)
}

/// Pumps the dispatcher until every recorded entry has resolved.
async fn settle(state: &api::AppState, dispatcher: &EventDispatcher<InMemoryLedger>) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let processed = dispatcher.poll_once().await.unwrap();
            if processed == 0 && state.ledger.pending_count().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("dispatch did not settle in time");
}

async fn post_json(app: &axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register_freelancer(app: &axum::Router, availability: u32) -> String {
    let (status, json) = post_json(
        app,
        "/freelancers",
        serde_json::json!({"name": "Ada", "weekly_availability": availability}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn register_project(app: &axum::Router, required_hours: u32) -> String {
    let (status, json) = post_json(
        app,
        "/projects",
        serde_json::json!({
            "name": "Billing revamp",
            "description": "Rework invoicing",
            "required_hours": required_hours
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup();
    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_register_and_get_freelancer() {
    let (app, _, _) = setup();
    let id = register_freelancer(&app, 40).await;

    let (status, json) = get_json(&app, &format!("/freelancers/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Ada");
    assert_eq!(json["weekly_availability"], 40);
}

#[tokio::test]
async fn test_get_unknown_freelancer_returns_404() {
    let (app, _, _) = setup();
    let (status, _) = get_json(&app, &format!("/freelancers/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_id_returns_400() {
    let (app, _, _) = setup();
    let (status, _) = get_json(&app, "/freelancers/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_join_happy_path() {
    let (app, state, dispatcher) = setup();
    let freelancer_id = register_freelancer(&app, 40).await;
    let project_id = register_project(&app, 100).await;

    let (status, json) = post_json(
        &app,
        &format!("/projects/{project_id}/join"),
        serde_json::json!({"freelancer_id": freelancer_id, "hours": 30}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["allocated_hours"], 30);

    settle(&state, &dispatcher).await;

    let (_, freelancer) = get_json(&app, &format!("/freelancers/{freelancer_id}")).await;
    assert_eq!(freelancer["weekly_availability"], 10);

    let (_, project) = get_json(&app, &format!("/projects/{project_id}")).await;
    assert_eq!(project["committed_hours"], 30);
    assert_eq!(project["commitments"][0]["freelancer_id"], freelancer_id);
}

#[tokio::test]
async fn test_join_shortfall_removes_commitment_later() {
    let (app, state, dispatcher) = setup();
    let freelancer_id = register_freelancer(&app, 10).await;
    let project_id = register_project(&app, 100).await;

    // The join is accepted even though the freelancer cannot cover it.
    let (status, _) = post_json(
        &app,
        &format!("/projects/{project_id}/join"),
        serde_json::json!({"freelancer_id": freelancer_id, "hours": 30}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    settle(&state, &dispatcher).await;

    // Eventual consistency: the freelancer disappeared from the committed
    // list and the availability never moved.
    let (_, project) = get_json(&app, &format!("/projects/{project_id}")).await;
    assert_eq!(project["committed_hours"], 0);
    assert_eq!(project["commitments"].as_array().unwrap().len(), 0);

    let (_, freelancer) = get_json(&app, &format!("/freelancers/{freelancer_id}")).await;
    assert_eq!(freelancer["weekly_availability"], 10);

    let (_, failed) = get_json(&app, "/ledger/failed").await;
    assert_eq!(failed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_join_unknown_freelancer_is_rejected() {
    let (app, _, _) = setup();
    let project_id = register_project(&app, 100).await;

    let (status, _) = post_json(
        &app,
        &format!("/projects/{project_id}/join"),
        serde_json::json!({"freelancer_id": uuid::Uuid::new_v4().to_string(), "hours": 30}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_duplicate_join_conflicts() {
    let (app, _, _) = setup();
    let freelancer_id = register_freelancer(&app, 80).await;
    let project_id = register_project(&app, 100).await;

    let (status, _) = post_json(
        &app,
        &format!("/projects/{project_id}/join"),
        serde_json::json!({"freelancer_id": freelancer_id, "hours": 30}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = post_json(
        &app,
        &format!("/projects/{project_id}/join"),
        serde_json::json!({"freelancer_id": freelancer_id, "hours": 10}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_zero_hour_join_is_bad_request() {
    let (app, _, _) = setup();
    let freelancer_id = register_freelancer(&app, 40).await;
    let project_id = register_project(&app, 100).await;

    let (status, _) = post_json(
        &app,
        &format!("/projects/{project_id}/join"),
        serde_json::json!({"freelancer_id": freelancer_id, "hours": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ledger_pending_shows_recorded_join() {
    let (app, _, _) = setup();
    let freelancer_id = register_freelancer(&app, 40).await;
    let project_id = register_project(&app, 100).await;

    post_json(
        &app,
        &format!("/projects/{project_id}/join"),
        serde_json::json!({"freelancer_id": freelancer_id, "hours": 30}),
    )
    .await;

    // Nothing has been dispatched yet: the join entry is visible as pending.
    let (status, pending) = get_json(&app, "/ledger/pending").await;
    assert_eq!(status, StatusCode::OK);
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["event_type"], "FreelancerJoinedProject");
    assert_eq!(pending[0]["state"], "pending");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _, _) = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
