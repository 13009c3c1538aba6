//! ABOUTME: Dependency-policy gating, evaluated only over already-completed dependencies
//! ABOUTME: Denying execution emits a StepOutput{skipped:true} with the denial reason

use std::collections::HashMap;

use teamforge_core::model::{DependencyPolicy, StepOutput};

/// Gate whether step `S` (with the given `policy` and `depends_on`) may run,
/// given the accumulated outputs of prior levels. Returns `Ok(())` to allow
/// execution, or `Err(reason)` to deny it.
pub fn gate(
    policy: DependencyPolicy,
    depends_on: &[String],
    completed: &HashMap<String, StepOutput>,
) -> Result<(), String> {
    let mut deps = Vec::with_capacity(depends_on.len());
    for name in depends_on {
        match completed.get(name) {
            Some(output) => deps.push(output),
            None => return Err(format!("dependency {name} has not completed yet")),
        }
    }

    match policy {
        DependencyPolicy::FailFast => {
            if let Some(failed) = deps.iter().find(|d| d.failed) {
                return Err(format!("dependency {} failed", failed.name));
            }
            Ok(())
        }
        DependencyPolicy::AllSuccess => {
            if let Some(bad) = deps.iter().find(|d| d.failed || d.skipped) {
                return Err(format!("dependency {} did not succeed", bad.name));
            }
            Ok(())
        }
        DependencyPolicy::AllComplete => Ok(()),
        DependencyPolicy::AnySuccess => {
            if deps.iter().any(|d| !d.failed && !d.skipped) {
                Ok(())
            } else {
                Err("no dependencies succeeded".to_string())
            }
        }
    }
}
