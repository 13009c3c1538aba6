//! ABOUTME: The monitor loop: runs the flow on a fixed cadence until canceled

use std::time::Duration;

use teamforge_flow::FlowExecutor;
use teamforge_runtime::WorkerRuntime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Repeatedly executes `executor`'s flow, recording the outcome, then sleeps
/// for `runtime.settings().sleep_duration` seconds before the next pass. The
/// sleep is interruptible: a cancellation during sleep ends the loop
/// immediately rather than waiting out the remainder.
pub async fn run(executor: FlowExecutor, runtime: WorkerRuntime, cancel: CancellationToken) {
    let sleep_duration = Duration::from_secs(runtime.settings().sleep_duration.max(1));

    loop {
        if cancel.is_cancelled() {
            info!("monitor loop stopping before next pass: canceled");
            return;
        }

        runtime.set_running(true);
        let result = executor.run(cancel.child_token()).await;
        runtime.set_running(false);
        runtime.record_flow_execution(result.success);

        if result.success {
            info!(steps = result.steps.len(), "flow pass completed");
        } else {
            warn!(error = ?result.error, "flow pass failed");
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("monitor loop canceled during sleep");
                return;
            }
            _ = tokio::time::sleep(sleep_duration) => {}
        }
    }
}
