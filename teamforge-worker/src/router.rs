//! ABOUTME: Assembles the worker's axum router, wiring auth and rate-limit middleware

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{auth_middleware, rate_limit_middleware};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::document_root))
        .route("/openapi.json", get(handlers::openapi_document))
        .route("/health", get(handlers::get_health))
        .route("/status", get(handlers::get_status))
        .route("/config", get(handlers::get_config))
        .route("/flow", get(handlers::get_flow))
        .route("/flow/steps", get(handlers::get_flow_steps))
        .route("/metrics", get(handlers::get_metrics))
        .route("/metrics/stream", get(handlers::stream_metrics))
        .route("/logs", get(handlers::list_logs))
        .route("/logs/stream", get(handlers::stream_logs))
        .route("/logs/:filename", get(handlers::get_log_file))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
