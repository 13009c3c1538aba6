//! ABOUTME: Shared axum state for the control-plane RPC surface

use std::sync::Arc;

use teamforge_core::RateLimiter;
use teamforge_registry::Registry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub api_key: Option<String>,
    pub rate_limiter: Arc<RateLimiter>,
}
