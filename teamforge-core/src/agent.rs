//! ABOUTME: Shared capability set implemented by every step agent adapter
//! ABOUTME: Adapters are opaque wrappers around an external AI-agent process

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;

/// Construction parameters passed to an adapter when a flow step binds it.
#[derive(Debug, Clone, Default)]
pub struct AgentSpec {
    /// Name the adapter instance is registered under, e.g. `"<workdir>/<step>"`.
    pub instance_name: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// Per-invocation run options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub working_directory: String,
    pub max_retries: u32,
    pub continue_mode: bool,
}

/// stdout/stderr captured from one agent invocation. The adapter layer never
/// fails silently: a non-zero exit or process-spawn error surfaces as `Err`.
#[derive(Debug, Clone, Default)]
pub struct AgentOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The capability set shared by every agent variant (`claude`, `gemini`, `qwen`,
/// `debug`, ...). Adapters are thread-confined per instance: a flow step gets
/// its own instance, so there is no cross-step contention.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
    fn agent_type(&self) -> &str;

    async fn run(
        &self,
        cancel: CancellationToken,
        prompt: &str,
        options: RunOptions,
    ) -> Result<AgentOutput, CoreError>;

    async fn is_available(&self) -> bool;

    fn version(&self) -> String;

    /// Detects the optional [`Configurable`] sub-capability. Adapters that need
    /// one-time setup (e.g. writing an MCP config into their working directory)
    /// before their first `run` override this to return `Some(self)`.
    fn as_configurable(&self) -> Option<&dyn Configurable> {
        None
    }
}

/// Optional capability, detected at registration time, for adapters that need
/// one-time setup (e.g. writing an MCP config file into the instance's working
/// directory) before their first `run`.
#[async_trait]
pub trait Configurable: Send + Sync {
    async fn configure(&self) -> Result<(), CoreError>;
}

/// Creates agent instances for a declared step `type`. One instance is created
/// per flow step so adapters never need to be `Clone`.
pub trait AgentFactory: Send + Sync {
    fn create(&self, agent_type: &str, spec: AgentSpec) -> Result<std::sync::Arc<dyn Agent>, CoreError>;
}
