//! ABOUTME: Agent adapter that shells out to an external AI-agent executable
//! ABOUTME: The launched process is an opaque black box: only stdout/stderr/exit matter

use std::collections::HashMap;

use async_trait::async_trait;
use teamforge_core::agent::{Agent, AgentOutput, RunOptions};
use teamforge_core::error::CoreError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Generic process-backed agent. `claude`, `gemini`, and `qwen` are all
/// instances of this adapter, differing only in the executable name and the
/// fixed args prepended ahead of the step's declared `args`.
pub struct ProcessAgent {
    instance_name: String,
    agent_type: String,
    executable: String,
    fixed_args: Vec<String>,
    env: HashMap<String, String>,
}

impl ProcessAgent {
    pub fn new(
        instance_name: String,
        agent_type: String,
        executable: String,
        fixed_args: Vec<String>,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            instance_name,
            agent_type,
            executable,
            fixed_args,
            env,
        }
    }
}

#[async_trait]
impl Agent for ProcessAgent {
    fn name(&self) -> &str {
        &self.instance_name
    }

    fn agent_type(&self) -> &str {
        &self.agent_type
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        prompt: &str,
        options: RunOptions,
    ) -> Result<AgentOutput, CoreError> {
        let mut command = Command::new(&self.executable);
        command
            .args(&self.fixed_args)
            .current_dir(&options.working_directory)
            .envs(&self.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = command.spawn().map_err(|e| CoreError::Agent {
            message: format!("failed to spawn {}: {e}", self.executable),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(prompt.as_bytes()).await;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                Err(CoreError::Agent { message: "canceled".to_string() })
            }
            output = child.wait_with_output() => {
                let output = output.map_err(|e| CoreError::Agent {
                    message: format!("agent process failed: {e}"),
                })?;
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if !output.status.success() {
                    warn!(instance = %self.instance_name, code = ?output.status.code(), "agent exited non-zero");
                    return Err(CoreError::Agent {
                        message: if stderr.is_empty() {
                            format!("{} exited with {:?}", self.executable, output.status.code())
                        } else {
                            stderr
                        },
                    });
                }
                debug!(instance = %self.instance_name, "agent run completed");
                Ok(AgentOutput { stdout, stderr })
            }
        }
    }

    async fn is_available(&self) -> bool {
        which(&self.executable)
    }

    fn version(&self) -> String {
        "unknown".to_string()
    }
}

/// Minimal `$PATH` executable lookup, avoiding a dependency on the `which` crate
/// for a single-purpose check.
fn which(executable: &str) -> bool {
    if std::path::Path::new(executable).is_absolute() {
        return std::path::Path::new(executable).exists();
    }
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join(executable).is_file())
        })
        .unwrap_or(false)
}
