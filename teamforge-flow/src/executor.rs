//! ABOUTME: The flow DAG scheduler: binds agents, runs levels with bounded parallelism,
//! ABOUTME: applies dependency policies/skip/retry, and records runtime stats

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use teamforge_core::agent::{Agent, AgentFactory, AgentSpec, RunOptions};
use teamforge_core::model::{DependencyPolicy, FlowResult, FlowStep, StepOutput};
use teamforge_runtime::WorkerRuntime;
use teamforge_templates::TemplateEvaluator;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{FlowError, Result};
use crate::leveling::resolve_levels;
use crate::policy;
use crate::retry::retry_delay;

/// Data record handed to input templates: `{inputs, step, flow}`.
#[derive(Serialize)]
struct InputData<'a> {
    inputs: Vec<String>,
    step: &'a FlowStep,
    flow: &'a str,
}

/// Data record handed to output templates: `{stdout, stderr}`.
#[derive(Serialize)]
struct OutputData<'a> {
    stdout: &'a str,
    stderr: &'a str,
}

/// Drives one worker's flow: validates the DAG once at construction, then
/// [`run`](Self::run) may be invoked repeatedly (by the monitor loop) to
/// execute a fresh pass, rebinding a fresh agent instance per step each time.
pub struct FlowExecutor {
    steps: Vec<FlowStep>,
    working_dir: PathBuf,
    runtime: WorkerRuntime,
    templates: TemplateEvaluator,
    factory: Arc<dyn AgentFactory>,
    /// Identity exposed to templates as `flow` for advanced templates.
    identity: String,
}

impl FlowExecutor {
    pub fn new(
        steps: Vec<FlowStep>,
        working_dir: PathBuf,
        runtime: WorkerRuntime,
        templates: TemplateEvaluator,
        factory: Arc<dyn AgentFactory>,
        identity: String,
    ) -> Result<Self> {
        crate::leveling::validate(&steps)?;
        Ok(Self {
            steps,
            working_dir,
            runtime,
            templates,
            factory,
            identity,
        })
    }

    fn workdir_basename(&self) -> String {
        self.working_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "flow".to_string())
    }

    /// Create one agent instance per declared step, calling its optional
    /// `configure` capability once. Propagates setup failures as fatal.
    async fn bind_agents(&self) -> Result<HashMap<String, Arc<dyn Agent>>> {
        let basename = self.workdir_basename();
        let mut agents = HashMap::with_capacity(self.steps.len());
        for step in &self.steps {
            let instance_name = format!("{basename}/{}", step.name);
            let agent = self
                .factory
                .create(
                    &step.step_type,
                    AgentSpec {
                        instance_name,
                        args: step.args.clone(),
                        env: step.env.clone(),
                    },
                )
                .map_err(|e| FlowError::Setup {
                    step: step.name.clone(),
                    message: e.to_string(),
                })?;
            if let Some(configurable) = agent.as_configurable() {
                configurable.configure().await.map_err(|e| FlowError::Setup {
                    step: step.name.clone(),
                    message: e.to_string(),
                })?;
            }
            agents.insert(step.name.clone(), agent);
        }
        Ok(agents)
    }

    /// Execute one full pass of the flow.
    pub async fn run(&self, cancel: CancellationToken) -> FlowResult {
        let levels = match resolve_levels(&self.steps) {
            Ok(levels) => levels,
            Err(e) => {
                return FlowResult {
                    steps: Vec::new(),
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };

        let agents = match self.bind_agents().await {
            Ok(a) => a,
            Err(e) => {
                return FlowResult {
                    steps: Vec::new(),
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };

        let steps_by_name: HashMap<&str, &FlowStep> =
            self.steps.iter().map(|s| (s.name.as_str(), s)).collect();
        let accumulated = Arc::new(RwLock::new(HashMap::<String, StepOutput>::new()));
        let mut all_outputs = Vec::new();

        for level in levels {
            let fail_fast_in_level = level.iter().any(|name| {
                matches!(steps_by_name[name.as_str()].dependency_policy, DependencyPolicy::FailFast)
            });
            let level_cancel = if fail_fast_in_level {
                cancel.child_token()
            } else {
                cancel.clone()
            };

            let outputs = if level.len() == 1 {
                let name = &level[0];
                vec![
                    self.execute_step(
                        steps_by_name[name.as_str()],
                        &agents[name.as_str()],
                        &accumulated,
                        level_cancel.clone(),
                    )
                    .await,
                ]
            } else {
                self.execute_level_concurrently(
                    &level,
                    &steps_by_name,
                    &agents,
                    &accumulated,
                    level_cancel.clone(),
                    fail_fast_in_level,
                )
                .await
            };

            let mut first_error = None;
            for output in &outputs {
                if output.failed && first_error.is_none() {
                    first_error = Some(format!("step {} failed: {}", output.name, output.stderr));
                }
            }

            if fail_fast_in_level && outputs.iter().any(|o| o.failed) {
                all_outputs.extend(outputs);
                return FlowResult {
                    steps: all_outputs,
                    success: false,
                    error: first_error,
                };
            }

            {
                let mut guard = accumulated.write();
                for output in &outputs {
                    guard.insert(output.name.clone(), output.clone());
                }
            }
            all_outputs.extend(outputs);
        }

        info!(steps = all_outputs.len(), "flow run completed");
        FlowResult {
            steps: all_outputs,
            success: true,
            error: None,
        }
    }

    async fn execute_level_concurrently(
        &self,
        level: &[String],
        steps_by_name: &HashMap<&str, &FlowStep>,
        agents: &HashMap<String, Arc<dyn Agent>>,
        accumulated: &Arc<RwLock<HashMap<String, StepOutput>>>,
        level_cancel: CancellationToken,
        fail_fast_in_level: bool,
    ) -> Vec<StepOutput> {
        let (tx, mut rx) = tokio::sync::mpsc::channel(level.len().max(1));
        for name in level {
            let step = (*steps_by_name[name.as_str()]).clone();
            let agent = agents[name.as_str()].clone();
            let accumulated = accumulated.clone();
            let level_cancel = level_cancel.clone();
            let tx = tx.clone();
            let this_runtime = self.runtime.clone();
            let this_templates = self.templates.clone();
            let working_dir = self.working_dir.clone();
            let identity = self.identity.clone();
            tokio::spawn(async move {
                let output = run_step(
                    &step,
                    &agent,
                    &accumulated,
                    &this_runtime,
                    &this_templates,
                    &working_dir,
                    &identity,
                    level_cancel,
                )
                .await;
                let _ = tx.send(output).await;
            });
        }
        drop(tx);

        let mut outputs = Vec::with_capacity(level.len());
        while let Some(output) = rx.recv().await {
            if fail_fast_in_level && output.failed {
                level_cancel.cancel();
            }
            outputs.push(output);
        }
        outputs
    }

    async fn execute_step(
        &self,
        step: &FlowStep,
        agent: &Arc<dyn Agent>,
        accumulated: &Arc<RwLock<HashMap<String, StepOutput>>>,
        level_cancel: CancellationToken,
    ) -> StepOutput {
        run_step(
            step,
            agent,
            accumulated,
            &self.runtime,
            &self.templates,
            &self.working_dir,
            &self.identity,
            level_cancel,
        )
        .await
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_step(
    step: &FlowStep,
    agent: &Arc<dyn Agent>,
    accumulated: &Arc<RwLock<HashMap<String, StepOutput>>>,
    runtime: &WorkerRuntime,
    templates: &TemplateEvaluator,
    working_dir: &Path,
    flow_identity: &str,
    level_cancel: CancellationToken,
) -> StepOutput {
    if level_cancel.is_cancelled() {
        return StepOutput::canceled(&step.name);
    }

    // Snapshot previously accumulated outputs under a read lock held only long
    // enough to copy the map.
    let deps_snapshot = accumulated.read().clone();

    if let Err(reason) = policy::gate(step.dependency_policy, &step.depends_on, &deps_snapshot) {
        let output = StepOutput::skipped(&step.name, reason);
        runtime.record_step_execution(&step.name, false, None, None);
        return output;
    }

    let inputs: Vec<String> = step
        .depends_on
        .iter()
        .map(|dep| deps_snapshot.get(dep).map(|o| o.stdout.clone()).unwrap_or_default())
        .collect();

    let input_data = InputData {
        inputs,
        step,
        flow: flow_identity,
    };

    if !step.skip_when.is_empty() {
        match templates.eval(&step.skip_when, &input_data) {
            Ok(rendered) if rendered.trim() == "true" => {
                let output = StepOutput::skipped(&step.name, String::new());
                runtime.record_step_execution(&step.name, false, None, None);
                return output;
            }
            Ok(_) => {}
            Err(e) => warn!(step = %step.name, error = %e, "skip_when template error; treating as not-skipping"),
        }
    }

    let prompt = if step.input.is_empty() {
        String::new()
    } else {
        match templates.eval(&step.input, &input_data) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(step = %step.name, error = %e, "input template error; falling back to raw input");
                step.input.clone()
            }
        }
    };

    runtime.set_step_active(&step.name, true);
    let result = execute_with_retry(step, agent, &prompt, working_dir, runtime, level_cancel).await;
    runtime.set_step_active(&step.name, false);

    match result {
        Ok(agent_output) => {
            if let Some(output_tpl) = Some(&step.output).filter(|s| !s.is_empty()) {
                let output_data = OutputData {
                    stdout: &agent_output.stdout,
                    stderr: &agent_output.stderr,
                };
                match templates.eval(output_tpl, &output_data) {
                    Ok(rendered) => {
                        let success_for_stats = agent_output.stderr.is_empty();
                        runtime.record_step_execution(
                            &step.name,
                            success_for_stats,
                            if rendered.is_empty() { None } else { Some(rendered.as_str()) },
                            if agent_output.stderr.is_empty() {
                                None
                            } else {
                                Some(agent_output.stderr.as_str())
                            },
                        );
                        StepOutput::completed(&step.name, rendered, agent_output.stderr)
                    }
                    Err(e) => {
                        warn!(step = %step.name, error = %e, "output template error; keeping raw stdout");
                        let success_for_stats = agent_output.stderr.is_empty();
                        runtime.record_step_execution(
                            &step.name,
                            success_for_stats,
                            Some(agent_output.stdout.as_str()),
                            if agent_output.stderr.is_empty() {
                                None
                            } else {
                                Some(agent_output.stderr.as_str())
                            },
                        );
                        StepOutput::completed(&step.name, agent_output.stdout, agent_output.stderr)
                    }
                }
            } else {
                let success_for_stats = agent_output.stderr.is_empty();
                runtime.record_step_execution(
                    &step.name,
                    success_for_stats,
                    Some(agent_output.stdout.as_str()),
                    if agent_output.stderr.is_empty() {
                        None
                    } else {
                        Some(agent_output.stderr.as_str())
                    },
                );
                StepOutput::completed(&step.name, agent_output.stdout, agent_output.stderr)
            }
        }
        Err(RunError::Canceled) => StepOutput::canceled(&step.name),
        Err(RunError::Failed(message)) => {
            runtime.record_step_execution(&step.name, false, None, Some(&message));
            StepOutput::failed(&step.name, message)
        }
    }
}

enum RunError {
    Canceled,
    Failed(String),
}

async fn execute_with_retry(
    step: &FlowStep,
    agent: &Arc<dyn Agent>,
    prompt: &str,
    working_dir: &Path,
    runtime: &WorkerRuntime,
    level_cancel: CancellationToken,
) -> std::result::Result<teamforge_core::agent::AgentOutput, RunError> {
    let max_attempts = step.retry.as_ref().map(|r| r.max_attempts).unwrap_or(1).max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        if level_cancel.is_cancelled() {
            return Err(RunError::Canceled);
        }
        runtime.record_retry_attempt(&step.name, attempt);

        let options = RunOptions {
            working_directory: working_dir.join(&step.name).to_string_lossy().to_string(),
            max_retries: 1,
            continue_mode: false,
        };

        tokio::select! {
            _ = level_cancel.cancelled() => return Err(RunError::Canceled),
            outcome = agent.run(level_cancel.clone(), prompt, options) => {
                match outcome {
                    Ok(output) => return Ok(output),
                    Err(e) => {
                        last_error = e.to_string();
                        if attempt < max_attempts {
                            if let Some(delay) = retry_delay(step.retry.as_ref(), attempt) {
                                let next_retry_at = chrono::Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
                                runtime.record_next_retry_time(&step.name, next_retry_at);
                                tokio::select! {
                                    _ = level_cancel.cancelled() => return Err(RunError::Canceled),
                                    _ = tokio::time::sleep(delay) => {}
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    Err(RunError::Failed(last_error))
}
