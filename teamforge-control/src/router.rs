//! ABOUTME: Assembles the control plane's axum router, wiring auth/rate-limit middleware and CORS

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{auth_middleware, rate_limit_middleware};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_methods(Any).allow_origin(Any);

    Router::new()
        .route("/", get(handlers::document_root))
        .route("/openapi.json", get(handlers::openapi_document))
        .route("/health", get(handlers::get_health))
        .route("/workers", get(handlers::get_workers))
        .route("/workers/:id", get(handlers::get_worker))
        .route("/workers/:id/health", get(handlers::proxy_health))
        .route("/workers/:id/status", get(handlers::proxy_status))
        .route("/workers/:id/config", get(handlers::proxy_config))
        .route("/workers/:id/flow", get(handlers::proxy_flow))
        .route("/workers/:id/flow/steps", get(handlers::proxy_flow_steps))
        .route("/workers/:id/metrics", get(handlers::proxy_metrics))
        .route("/workers/:id/logs", get(handlers::proxy_logs))
        .route("/workers/:id/logs/:filename", get(handlers::proxy_log_file))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
