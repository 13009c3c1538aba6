//! ABOUTME: Shared-secret auth and per-source rate limiting for the worker RPC surface

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::net::SocketAddr;

use crate::state::AppState;

/// Documentation routes are exempt from both auth and rate limiting per §6.
fn is_documentation_route(path: &str) -> bool {
    path == "/" || path == "/openapi.json"
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if is_documentation_route(request.uri().path()) {
        return next.run(request).await;
    }

    if let Some(expected) = &state.api_key {
        let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "unauthenticated"})),
            )
                .into_response();
        }
    }

    next.run(request).await
}

fn client_id(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }
    addr.map(|a| a.ip().to_string()).unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if is_documentation_route(request.uri().path()) {
        return next.run(request).await;
    }

    let source = client_id(&headers, connect_info.map(|c| c.0));
    if !state.rate_limiter.check(&source) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "rate limit exceeded"})),
        )
            .into_response();
    }

    next.run(request).await
}
