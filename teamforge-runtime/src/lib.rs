//! ABOUTME: Worker runtime state: effective settings, lifecycle flag, and statistics
//! ABOUTME: A single mutex guards the whole StepStats map so readers never see a torn entry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use teamforge_core::model::{truncate_last_output, FlowStats, StepStats, Worker, WorkerSettings};
use tracing::debug;

struct Inner {
    stats: Mutex<HashMap<String, StepStats>>,
    flow_stats: Mutex<FlowStats>,
    running: Mutex<bool>,
    last_activity: Mutex<Option<chrono::DateTime<Utc>>>,
    start_time: Instant,
    start_time_utc: chrono::DateTime<Utc>,
    worker: Worker,
    settings: WorkerSettings,
    working_directory: std::path::PathBuf,
}

/// Concurrency-safe worker runtime state. Cheaply `Clone`-able (an `Arc` handle)
/// so the flow executor can hold a stats-writer capability without sharing a
/// raw mutable pointer into the runtime.
#[derive(Clone)]
pub struct WorkerRuntime {
    inner: Arc<Inner>,
}

impl WorkerRuntime {
    /// Initialize StepStats for every declared step: `enabled=true, active=false, counts=0`.
    pub fn init(worker: Worker, settings: WorkerSettings, working_directory: std::path::PathBuf) -> Self {
        let mut stats = HashMap::with_capacity(settings.flow.len());
        for step in &settings.flow {
            stats.insert(step.name.clone(), StepStats::new_enabled());
        }
        Self {
            inner: Arc::new(Inner {
                stats: Mutex::new(stats),
                flow_stats: Mutex::new(FlowStats::default()),
                running: Mutex::new(false),
                last_activity: Mutex::new(None),
                start_time: Instant::now(),
                start_time_utc: Utc::now(),
                worker,
                settings,
                working_directory,
            }),
        }
    }

    pub fn worker(&self) -> &Worker {
        &self.inner.worker
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.inner.settings
    }

    pub fn working_directory(&self) -> &std::path::Path {
        &self.inner.working_directory
    }

    pub fn is_running(&self) -> bool {
        *self.inner.running.lock()
    }

    /// Set the running flag. Transitioning to running additionally stamps `last_activity`.
    pub fn set_running(&self, running: bool) {
        *self.inner.running.lock() = running;
        if running {
            *self.inner.last_activity.lock() = Some(Utc::now());
        }
    }

    pub fn last_activity(&self) -> Option<chrono::DateTime<Utc>> {
        *self.inner.last_activity.lock()
    }

    pub fn set_step_active(&self, step: &str, active: bool) {
        let mut stats = self.inner.stats.lock();
        if let Some(entry) = stats.get_mut(step) {
            entry.active = active;
        }
    }

    pub fn is_any_step_active(&self) -> bool {
        self.inner.stats.lock().values().any(|s| s.active)
    }

    /// Record the outcome of one step execution. The mutator clears `last_error`
    /// on success, and only sets it on failure when an error message was supplied.
    pub fn record_step_execution(
        &self,
        step: &str,
        success: bool,
        output: Option<&str>,
        error: Option<&str>,
    ) {
        let mut stats = self.inner.stats.lock();
        let entry = stats.entry(step.to_string()).or_insert_with(StepStats::new_enabled);
        entry.execution_count += 1;
        if success {
            entry.success_count += 1;
            entry.last_error = None;
        } else if let Some(err) = error {
            entry.last_error = Some(err.to_string());
        }
        entry.last_success = success;
        entry.last_execution = Some(Utc::now());
        if let Some(out) = output {
            entry.last_output = Some(truncate_last_output(out));
        }
        debug!(step, success, "recorded step execution");
    }

    pub fn record_retry_attempt(&self, step: &str, attempt: u32) {
        let mut stats = self.inner.stats.lock();
        let entry = stats.entry(step.to_string()).or_insert_with(StepStats::new_enabled);
        entry.retry_attempt = attempt;
        if attempt > 1 {
            entry.last_retry_time = Some(Utc::now());
            entry.total_retries = attempt - 1;
        }
    }

    pub fn record_next_retry_time(&self, step: &str, at: chrono::DateTime<Utc>) {
        let mut stats = self.inner.stats.lock();
        if let Some(entry) = stats.get_mut(step) {
            entry.next_retry_time = Some(at);
        }
    }

    pub fn record_flow_execution(&self, success: bool) {
        let mut flow_stats = self.inner.flow_stats.lock();
        flow_stats.execution_count += 1;
        if success {
            flow_stats.success_count += 1;
        }
        flow_stats.last_execution = Some(Utc::now());
    }

    /// Snapshot of one step's stats. Returns `None` if the step is unknown.
    pub fn get_step_stats(&self, step: &str) -> Option<StepStats> {
        self.inner.stats.lock().get(step).cloned()
    }

    /// Snapshot (map copy) of all step stats. Callers cannot observe updates in progress.
    pub fn get_all_step_stats(&self) -> HashMap<String, StepStats> {
        self.inner.stats.lock().clone()
    }

    pub fn flow_stats(&self) -> FlowStats {
        self.inner.flow_stats.lock().clone()
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.inner.start_time.elapsed()
    }

    pub fn start_time(&self) -> chrono::DateTime<Utc> {
        self.inner.start_time_utc
    }
}
