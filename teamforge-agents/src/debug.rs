//! ABOUTME: Deterministic in-process agent used for the "debug" step type and tests
//! ABOUTME: Never spawns a process; behavior is driven entirely by env/args so flows are reproducible

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use teamforge_core::agent::{Agent, AgentOutput, RunOptions};
use teamforge_core::error::CoreError;
use tokio_util::sync::CancellationToken;

/// A debug agent that echoes its prompt back as stdout. Recognizes a handful
/// of env keys so tests can script latency and failure without external
/// processes: `DEBUG_FAIL=1` fails the run, `DEBUG_SLEEP_MS=<n>` sleeps for
/// `n` milliseconds (interruptibly) before responding.
pub struct DebugAgent {
    instance_name: String,
    env: HashMap<String, String>,
}

impl DebugAgent {
    pub fn new(instance_name: String, env: HashMap<String, String>) -> Self {
        Self { instance_name, env }
    }
}

#[async_trait]
impl Agent for DebugAgent {
    fn name(&self) -> &str {
        &self.instance_name
    }

    fn agent_type(&self) -> &str {
        "debug"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        prompt: &str,
        _options: RunOptions,
    ) -> Result<AgentOutput, CoreError> {
        if let Some(ms) = self.env.get("DEBUG_SLEEP_MS").and_then(|v| v.parse::<u64>().ok()) {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(CoreError::Agent { message: "canceled".to_string() });
                }
                _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
            }
        }

        if self.env.get("DEBUG_FAIL").map(String::as_str) == Some("1") {
            return Err(CoreError::Agent {
                message: self
                    .env
                    .get("DEBUG_FAIL_MESSAGE")
                    .cloned()
                    .unwrap_or_else(|| "debug agent configured to fail".to_string()),
            });
        }

        Ok(AgentOutput {
            stdout: prompt.to_string(),
            stderr: self.env.get("DEBUG_STDERR").cloned().unwrap_or_default(),
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn version(&self) -> String {
        "debug-1".to_string()
    }
}
