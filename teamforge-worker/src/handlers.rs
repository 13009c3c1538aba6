//! ABOUTME: Axum handlers backing the worker RPC surface described in the worker contract

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use teamforge_agents::DefaultAgentFactory;
use teamforge_core::agent::{AgentFactory, AgentSpec};
use teamforge_core::model::StepStats;
use teamforge_core::HealthCheck;
use teamforge_core::HealthResponse;

use crate::logs;
use crate::state::AppState;

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    mode: String,
    uptime_seconds: u64,
    worker_name: String,
    last_activity: Option<chrono::DateTime<Utc>>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let running_and_active = state.runtime.is_running() && state.runtime.is_any_step_active();
    let status = if running_and_active { "running" } else { "idle" };
    Json(StatusResponse {
        status: status.to_string(),
        mode: "both".to_string(),
        uptime_seconds: state.runtime.uptime().as_secs(),
        worker_name: state.runtime.worker().name.clone(),
        last_activity: state.runtime.last_activity(),
    })
}

/// One check per distinct step type in the flow (agent availability), plus a
/// working-directory-accessibility check. `healthy` iff every check passes.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let factory = DefaultAgentFactory;
    let mut checks = Vec::new();

    let mut seen_types: Vec<&str> = Vec::new();
    for step in &state.runtime.settings().flow {
        if seen_types.contains(&step.step_type.as_str()) {
            continue;
        }
        seen_types.push(&step.step_type);

        let check = match factory.create(
            &step.step_type,
            AgentSpec {
                instance_name: format!("health/{}", step.step_type),
                args: vec![],
                env: HashMap::new(),
            },
        ) {
            Ok(agent) => {
                if agent.is_available().await {
                    HealthCheck {
                        name: format!("agent:{}", step.step_type),
                        status: "healthy".to_string(),
                        message: None,
                    }
                } else {
                    HealthCheck {
                        name: format!("agent:{}", step.step_type),
                        status: "unhealthy".to_string(),
                        message: Some("agent executable not available".to_string()),
                    }
                }
            }
            Err(e) => HealthCheck {
                name: format!("agent:{}", step.step_type),
                status: "unhealthy".to_string(),
                message: Some(e.to_string()),
            },
        };
        checks.push(check);
    }

    let working_dir_check = if state.runtime.working_directory().is_dir() {
        HealthCheck {
            name: "working_directory".to_string(),
            status: "healthy".to_string(),
            message: None,
        }
    } else {
        HealthCheck {
            name: "working_directory".to_string(),
            status: "unhealthy".to_string(),
            message: Some("working directory is not accessible".to_string()),
        }
    };
    checks.push(working_dir_check);

    let status = if checks.iter().all(|c| c.status == "healthy") {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        checks,
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
struct ConfigResponse {
    name: String,
    #[serde(rename = "type")]
    worker_type: String,
    enabled: bool,
    version: String,
    team_name: String,
    flow_step_count: usize,
}

pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let worker = state.runtime.worker();
    let settings = state.runtime.settings();
    Json(ConfigResponse {
        name: worker.name.clone(),
        worker_type: "agentic".to_string(),
        enabled: worker.enabled,
        version: env!("CARGO_PKG_VERSION").to_string(),
        team_name: settings.team_name.clone(),
        flow_step_count: settings.flow.len(),
    })
}

#[derive(Serialize)]
struct FlowResponse {
    total_steps: usize,
    enabled_steps: usize,
    last_execution: Option<chrono::DateTime<Utc>>,
    execution_count: u64,
    success_rate: Option<f64>,
}

pub async fn get_flow(State(state): State<AppState>) -> Json<FlowResponse> {
    let all_stats = state.runtime.get_all_step_stats();
    let flow_stats = state.runtime.flow_stats();
    let success_rate = if flow_stats.execution_count > 0 {
        Some(flow_stats.success_count as f64 / flow_stats.execution_count as f64)
    } else {
        None
    };
    Json(FlowResponse {
        total_steps: state.runtime.settings().flow.len(),
        enabled_steps: all_stats.values().filter(|s| s.enabled).count(),
        last_execution: flow_stats.last_execution,
        execution_count: flow_stats.execution_count,
        success_rate,
    })
}

#[derive(Serialize)]
struct FlowStepResponse {
    name: String,
    #[serde(rename = "type")]
    step_type: String,
    depends_on: Vec<String>,
    dependency_policy: String,
    stats: Option<StepStats>,
}

pub async fn get_flow_steps(State(state): State<AppState>) -> Json<Vec<FlowStepResponse>> {
    let steps = state
        .runtime
        .settings()
        .flow
        .iter()
        .map(|step| FlowStepResponse {
            name: step.name.clone(),
            step_type: step.step_type.clone(),
            depends_on: step.depends_on.clone(),
            dependency_policy: format!("{:?}", step.dependency_policy),
            stats: state.runtime.get_step_stats(&step.name),
        })
        .collect::<Vec<_>>();
    Json(steps)
}

#[derive(Serialize)]
struct MetricsResponse {
    uptime_seconds: u64,
    avg_exec_time_ms: Option<f64>,
    last_activity: Option<chrono::DateTime<Utc>>,
}

pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        uptime_seconds: state.runtime.uptime().as_secs(),
        avg_exec_time_ms: None,
        last_activity: state.runtime.last_activity(),
    })
}

#[derive(Deserialize)]
pub struct ListLogsQuery {
    role: Option<String>,
    limit: Option<u32>,
}

pub async fn list_logs(State(state): State<AppState>, Query(query): Query<ListLogsQuery>) -> Response {
    let entries = logs::list_logs(state.runtime.working_directory(), query.role.as_deref(), query.limit);
    Json(entries).into_response()
}

#[derive(Deserialize)]
pub struct GetLogFileQuery {
    tail: Option<u32>,
}

pub async fn get_log_file(
    State(state): State<AppState>,
    axum::extract::Path(filename): axum::extract::Path<String>,
    Query(query): Query<GetLogFileQuery>,
) -> Response {
    match logs::read_log_file(state.runtime.working_directory(), &filename, query.tail) {
        Ok(content) => (StatusCode::OK, content).into_response(),
        Err(logs::LogFileError::InvalidName) => {
            (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid log filename"}))).into_response()
        }
        Err(logs::LogFileError::NotFound) => {
            (StatusCode::NOT_FOUND, Json(json!({"error": "log file not found"}))).into_response()
        }
        Err(logs::LogFileError::Io(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

pub async fn stream_logs() -> impl IntoResponse {
    (StatusCode::NOT_IMPLEMENTED, Json(json!({"error": "log streaming is not implemented"})))
}

pub async fn stream_metrics() -> impl IntoResponse {
    (StatusCode::NOT_IMPLEMENTED, Json(json!({"error": "metrics streaming is not implemented"})))
}

/// Enumerates the RPC surface. Exempt from auth/rate limiting so a caller can
/// discover what's available before authenticating.
pub async fn openapi_document(State(state): State<AppState>) -> Json<serde_json::Value> {
    let _ = &state;
    Json(json!({
        "routes": [
            "GET /health",
            "GET /status",
            "GET /config",
            "GET /flow",
            "GET /flow/steps",
            "GET /metrics",
            "GET /logs",
            "GET /logs/:filename",
            "GET /logs/stream",
            "GET /metrics/stream",
        ]
    }))
}

pub async fn document_root(state: State<AppState>) -> Json<serde_json::Value> {
    openapi_document(state).await
}
