//! ABOUTME: Wire types shared between the worker RPC surface and the registry's typed client
//! ABOUTME: Every response is a timestamped envelope per the worker RPC surface contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named check inside a [`HealthResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GetHealth` envelope. `status` is `"healthy"` iff no check reports `"fail"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub checks: Vec<HealthCheck>,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// `GetConfig` envelope, as returned by a worker's `/config` route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub worker_type: String,
    pub enabled: bool,
    pub version: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub flow_step_count: usize,
}
