//! ABOUTME: Shared axum state for the worker RPC surface

use std::sync::Arc;

use teamforge_core::RateLimiter;
use teamforge_runtime::WorkerRuntime;

#[derive(Clone)]
pub struct AppState {
    pub runtime: WorkerRuntime,
    pub api_key: Option<String>,
    pub rate_limiter: Arc<RateLimiter>,
}
