//! ABOUTME: Data model for workers, flows, steps, and their runtime statistics
//! ABOUTME: Mirrors the YAML configuration shape described in the worker config contract

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept in `StepStats::last_output` before truncation.
pub const LAST_OUTPUT_MAX_CHARS: usize = 500;

/// Default cap applied to any computed retry delay.
pub const DEFAULT_MAX_RETRY_DELAY_SECS: u64 = 300;

fn default_true() -> bool {
    true
}

/// A worker as loaded from `config.yaml`. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub settings: Option<WorkerSettings>,
}

impl Worker {
    /// Validate the required fields of a freshly-parsed worker config.
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        if self.name.trim().is_empty() {
            return Err(crate::error::CoreError::Validation {
                message: "worker name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Compute the effective settings, filling in defaults for anything left unset.
    pub fn effective_settings(&self) -> WorkerSettings {
        self.settings.clone().unwrap_or_default()
    }
}

/// Effective worker knobs, with defaults filled in where the config omitted them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub sleep_duration: u64,
    pub team_name: String,
    pub http_port: u16,
    pub install_deps: bool,
    pub common_prompt: String,
    pub max_attempts: u32,
    pub debug: bool,
    pub meta: HashMap<String, String>,
    pub service: HashMap<String, String>,
    pub mcp_servers: HashMap<String, McpServerSpec>,
    pub hooks: HookSet,
    pub flow: Vec<FlowStep>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            sleep_duration: 60,
            team_name: "autoteam".to_string(),
            http_port: 0,
            install_deps: false,
            common_prompt: String::new(),
            max_attempts: 3,
            debug: false,
            meta: HashMap::new(),
            service: HashMap::new(),
            mcp_servers: HashMap::new(),
            hooks: HookSet::default(),
            flow: Vec::new(),
        }
    }
}

/// An external MCP server command specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServerSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Lifecycle-hook command lists, one list per lifecycle event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSet {
    pub pre_start: Vec<String>,
    pub post_start: Vec<String>,
    pub pre_stop: Vec<String>,
    pub post_stop: Vec<String>,
}

/// Dependency gating policy for a flow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPolicy {
    FailFast,
    AllSuccess,
    AllComplete,
    AnySuccess,
}

impl Default for DependencyPolicy {
    fn default() -> Self {
        Self::FailFast
    }
}

/// Backoff curve applied between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Fixed,
    Linear,
    Exponential,
}

/// Per-step retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub delay: u64,
    #[serde(default = "default_backoff")]
    pub backoff: Backoff,
    #[serde(default = "default_max_delay")]
    pub max_delay: u64,
}

fn default_max_attempts() -> u32 {
    1
}
fn default_backoff() -> Backoff {
    Backoff::Fixed
}
fn default_max_delay() -> u64 {
    DEFAULT_MAX_RETRY_DELAY_SECS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: 0,
            backoff: default_backoff(),
            max_delay: default_max_delay(),
        }
    }
}

/// A single node in the flow DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStep {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub skip_when: String,
    #[serde(default)]
    pub dependency_policy: DependencyPolicy,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

/// The result of executing a single step, once per flow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepOutput {
    pub name: String,
    pub stdout: String,
    pub stderr: String,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub canceled: bool,
}

impl StepOutput {
    pub fn completed(name: impl Into<String>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            ..Default::default()
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stderr: reason.into(),
            skipped: true,
            ..Default::default()
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stderr: error.into(),
            failed: true,
            ..Default::default()
        }
    }

    pub fn canceled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stderr: "canceled due to fail_fast policy".to_string(),
            canceled: true,
            ..Default::default()
        }
    }

    /// Whether this step "succeeded" for dependency-gating purposes: it simply
    /// wasn't marked failed. Skipped and canceled steps still count as "not failed".
    pub fn gating_succeeded(&self) -> bool {
        !self.failed
    }
}

/// Long-lived per-step counters, one entry per declared flow step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepStats {
    pub enabled: bool,
    pub active: bool,
    pub last_execution: Option<DateTime<Utc>>,
    pub last_success: bool,
    pub execution_count: u64,
    pub success_count: u64,
    pub last_output: Option<String>,
    pub last_error: Option<String>,
    pub retry_attempt: u32,
    pub total_retries: u32,
    pub last_retry_time: Option<DateTime<Utc>>,
    pub next_retry_time: Option<DateTime<Utc>>,
}

impl StepStats {
    pub fn new_enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }
}

/// Truncate `text` to [`LAST_OUTPUT_MAX_CHARS`] characters, appending `...` when
/// truncation actually happened. The result never exceeds 503 characters.
pub fn truncate_last_output(text: &str) -> String {
    let char_count = text.chars().count();
    if char_count <= LAST_OUTPUT_MAX_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(LAST_OUTPUT_MAX_CHARS).collect();
    format!("{truncated}...")
}

/// Cumulative flow-level counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowStats {
    pub execution_count: u64,
    pub success_count: u64,
    pub last_execution: Option<DateTime<Utc>>,
}

/// Final outcome of one flow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowResult {
    pub steps: Vec<StepOutput>,
    pub success: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_noop_under_limit() {
        let s = "x".repeat(500);
        assert_eq!(truncate_last_output(&s), s);
    }

    #[test]
    fn truncation_adds_ellipsis_over_limit() {
        let s = "x".repeat(501);
        let truncated = truncate_last_output(&s);
        assert_eq!(truncated.chars().count(), 503);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn worker_rejects_empty_name() {
        let w = Worker {
            name: "  ".to_string(),
            prompt: String::new(),
            enabled: true,
            settings: None,
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn effective_settings_fill_defaults() {
        let w = Worker {
            name: "w1".to_string(),
            prompt: String::new(),
            enabled: true,
            settings: None,
        };
        let settings = w.effective_settings();
        assert_eq!(settings.sleep_duration, 60);
        assert_eq!(settings.team_name, "autoteam");
        assert_eq!(settings.max_attempts, 3);
    }

    #[test]
    fn worker_config_parses_from_yaml() {
        let yaml = r#"
name: reviewer
prompt: "review code"
settings:
  sleep_duration: 30
  flow:
    - name: a
      type: claude
      input: "{{ step.name }}"
"#;
        let worker: Worker = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(worker.name, "reviewer");
        let settings = worker.effective_settings();
        assert_eq!(settings.sleep_duration, 30);
        assert_eq!(settings.flow.len(), 1);
        assert_eq!(settings.flow[0].step_type, "claude");
    }
}
