//! ABOUTME: HTTP-level tests for the worker RPC surface, exercised in-process via `Router::oneshot`

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use teamforge_core::ratelimit::TokenBucketConfig;
use teamforge_core::model::{DependencyPolicy, FlowStep, Worker, WorkerSettings};
use teamforge_core::RateLimiter;
use teamforge_runtime::WorkerRuntime;
use teamforge_worker::state::AppState;

fn one_step_flow() -> WorkerSettings {
    let mut settings = WorkerSettings::default();
    settings.flow.push(FlowStep {
        name: "check".to_string(),
        step_type: "debug".to_string(),
        args: vec![],
        env: Default::default(),
        depends_on: vec![],
        input: String::new(),
        output: String::new(),
        skip_when: String::new(),
        dependency_policy: DependencyPolicy::FailFast,
        retry: None,
    });
    settings
}

fn state_with_api_key(api_key: Option<&str>) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let worker = Worker {
        name: "demo-worker".to_string(),
        prompt: String::new(),
        enabled: true,
        settings: None,
    };
    let runtime = WorkerRuntime::init(worker, one_step_flow(), dir.path().to_path_buf());
    let state = AppState {
        runtime,
        api_key: api_key.map(str::to_string),
        rate_limiter: Arc::new(RateLimiter::new(TokenBucketConfig::per_minute(600))),
    };
    (state, dir)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_healthy_working_directory() {
    let (state, _dir) = state_with_api_key(None);
    let app = teamforge_worker::build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["checks"].as_array().unwrap().iter().any(|c| c["name"] == "working_directory"));
}

#[tokio::test]
async fn status_reports_worker_name() {
    let (state, _dir) = state_with_api_key(None);
    let app = teamforge_worker::build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["worker_name"], "demo-worker");
    assert_eq!(body["status"], "idle");
}

#[tokio::test]
async fn config_reports_flow_step_count() {
    let (state, _dir) = state_with_api_key(None);
    let app = teamforge_worker::build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/config").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "demo-worker");
    assert_eq!(body["flow_step_count"], 1);
}

#[tokio::test]
async fn flow_steps_lists_the_declared_step() {
    let (state, _dir) = state_with_api_key(None);
    let app = teamforge_worker::build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/flow/steps").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let steps = body.as_array().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["name"], "check");
}

#[tokio::test]
async fn logs_endpoint_is_empty_for_a_fresh_working_directory() {
    let (state, _dir) = state_with_api_key(None);
    let app = teamforge_worker::build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/logs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn missing_api_key_is_rejected_when_one_is_configured() {
    let (state, _dir) = state_with_api_key(Some("secret"));
    let app = teamforge_worker::build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn correct_api_key_is_accepted() {
    let (state, _dir) = state_with_api_key(Some("secret"));
    let app = teamforge_worker::build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/status")
                .header("x-api-key", "secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn documentation_route_is_exempt_from_auth() {
    let (state, _dir) = state_with_api_key(Some("secret"));
    let app = teamforge_worker::build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_log_file_is_not_found() {
    let (state, _dir) = state_with_api_key(None);
    let app = teamforge_worker::build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/logs/ghost.log").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
