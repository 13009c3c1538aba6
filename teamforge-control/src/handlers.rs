//! ABOUTME: Axum handlers for the control plane: aggregate queries plus proxied passthroughs

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::error::RpcError;
use crate::state::AppState;

#[derive(Serialize)]
struct AggregateHealthResponse {
    status: String,
    workers: Vec<WorkerStatusEntry>,
}

#[derive(Serialize)]
struct WorkerStatusEntry {
    id: String,
    status: String,
}

fn status_label(status: teamforge_registry::WorkerStatus) -> &'static str {
    match status {
        teamforge_registry::WorkerStatus::Unknown => "unknown",
        teamforge_registry::WorkerStatus::Reachable => "reachable",
        teamforge_registry::WorkerStatus::Unreachable => "unreachable",
    }
}

fn aggregate_label(status: teamforge_registry::AggregateHealth) -> &'static str {
    match status {
        teamforge_registry::AggregateHealth::Healthy => "healthy",
        teamforge_registry::AggregateHealth::Degraded => "degraded",
        teamforge_registry::AggregateHealth::Unhealthy => "unhealthy",
    }
}

pub async fn get_health(State(state): State<AppState>) -> Json<AggregateHealthResponse> {
    let workers = state
        .registry
        .list()
        .into_iter()
        .map(|w| WorkerStatusEntry {
            id: w.id,
            status: status_label(w.status).to_string(),
        })
        .collect();
    Json(AggregateHealthResponse {
        status: aggregate_label(state.registry.aggregate_health()).to_string(),
        workers,
    })
}

pub async fn get_workers(State(state): State<AppState>) -> Response {
    let workers: Vec<_> = state
        .registry
        .list()
        .into_iter()
        .map(|w| {
            json!({
                "id": w.id,
                "name": w.name,
                "url": w.url,
                "status": status_label(w.status),
                "type": w.worker_type,
                "version": w.version,
                "available": w.available,
            })
        })
        .collect();
    Json(workers).into_response()
}

pub async fn get_worker(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, RpcError> {
    let worker = state.registry.get(&id).ok_or_else(|| RpcError::NotFound { id: id.clone() })?;
    Ok(Json(json!({
        "id": worker.id,
        "name": worker.name,
        "url": worker.url,
        "status": status_label(worker.status),
        "type": worker.worker_type,
        "version": worker.version,
        "available": worker.available,
        "health": worker.health,
    }))
    .into_response())
}

/// Resolve the worker's client, invoke `path` on it, and record the proxy
/// outcome (`reachable`/`unreachable`) on the registry entry. Transport or
/// RPC failure surfaces as `502 bad gateway`.
async fn proxy_json(state: &AppState, id: &str, path: &str) -> Result<Response, RpcError> {
    let client = state.registry.client(id).map_err(|_| RpcError::NotFound { id: id.to_string() })?;

    match client.get_json(path).await {
        Ok(body) => {
            state.registry.record_proxy_outcome(id, true);
            Ok(Json(body).into_response())
        }
        Err(e) => {
            state.registry.record_proxy_outcome(id, false);
            Err(RpcError::BadGateway {
                id: id.to_string(),
                message: e.to_string(),
            })
        }
    }
}

pub async fn proxy_health(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, RpcError> {
    proxy_json(&state, &id, "/health").await
}

pub async fn proxy_status(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, RpcError> {
    proxy_json(&state, &id, "/status").await
}

pub async fn proxy_config(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, RpcError> {
    proxy_json(&state, &id, "/config").await
}

pub async fn proxy_flow(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, RpcError> {
    proxy_json(&state, &id, "/flow").await
}

pub async fn proxy_flow_steps(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, RpcError> {
    proxy_json(&state, &id, "/flow/steps").await
}

pub async fn proxy_metrics(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, RpcError> {
    proxy_json(&state, &id, "/metrics").await
}

#[derive(serde::Deserialize)]
pub struct LogsQuery {
    role: Option<String>,
    limit: Option<u32>,
}

pub async fn proxy_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Response, RpcError> {
    let mut path = "/logs".to_string();
    let mut params = Vec::new();
    if let Some(role) = &query.role {
        params.push(format!("role={role}"));
    }
    if let Some(limit) = query.limit {
        params.push(format!("limit={limit}"));
    }
    if !params.is_empty() {
        path.push('?');
        path.push_str(&params.join("&"));
    }
    proxy_json(&state, &id, &path).await
}

pub async fn proxy_log_file(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
) -> Result<Response, RpcError> {
    let client = state.registry.client(&id).map_err(|_| RpcError::NotFound { id: id.clone() })?;

    match client.get_text(&format!("/logs/{filename}")).await {
        Ok(body) => {
            state.registry.record_proxy_outcome(&id, true);
            Ok((StatusCode::OK, body).into_response())
        }
        Err(e) => {
            state.registry.record_proxy_outcome(&id, false);
            Err(RpcError::BadGateway {
                id,
                message: e.to_string(),
            })
        }
    }
}

pub async fn openapi_document() -> Json<serde_json::Value> {
    Json(json!({
        "routes": [
            "GET /health",
            "GET /workers",
            "GET /workers/:id",
            "GET /workers/:id/health",
            "GET /workers/:id/status",
            "GET /workers/:id/config",
            "GET /workers/:id/flow",
            "GET /workers/:id/flow/steps",
            "GET /workers/:id/metrics",
            "GET /workers/:id/logs",
            "GET /workers/:id/logs/:filename",
        ]
    }))
}

pub async fn document_root() -> Json<serde_json::Value> {
    openapi_document().await
}
