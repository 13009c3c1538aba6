//! ABOUTME: Flow validation and Kahn's-algorithm topological leveling
//! ABOUTME: A level is the maximal set of steps whose dependencies are all already satisfied

use std::collections::{HashMap, HashSet};

use teamforge_core::model::FlowStep;

use crate::error::{FlowError, Result};

/// Validate structural constraints: non-empty flow, non-empty name/type per
/// step, unique names, and every `depends_on` target present in the flow.
pub fn validate(steps: &[FlowStep]) -> Result<()> {
    if steps.is_empty() {
        return Err(FlowError::EmptyFlow);
    }

    let mut seen = HashSet::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            return Err(FlowError::MissingName { index });
        }
        if step.step_type.trim().is_empty() {
            return Err(FlowError::MissingType { name: step.name.clone() });
        }
        if !seen.insert(step.name.as_str()) {
            return Err(FlowError::DuplicateName { name: step.name.clone() });
        }
    }

    let names: HashSet<&str> = steps.iter().map(|s| s.name.as_str()).collect();
    for step in steps {
        for dep in &step.depends_on {
            if !names.contains(dep.as_str()) {
                return Err(FlowError::UnknownDependency {
                    step: step.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Partition `steps` into topological levels. Each level's step names are
/// sorted lexicographically for deterministic ordering. Any flow containing a
/// cycle (including self-loops) fails with [`FlowError::CircularDependency`]
/// before any step executes.
pub fn resolve_levels(steps: &[FlowStep]) -> Result<Vec<Vec<String>>> {
    validate(steps)?;

    let mut in_degree: HashMap<&str, usize> = steps.iter().map(|s| (s.name.as_str(), 0)).collect();
    let mut successors: HashMap<&str, Vec<&str>> = steps.iter().map(|s| (s.name.as_str(), Vec::new())).collect();

    for step in steps {
        for dep in &step.depends_on {
            *in_degree.get_mut(step.name.as_str()).unwrap() += 1;
            successors.get_mut(dep.as_str()).unwrap().push(step.name.as_str());
        }
    }

    let mut remaining = in_degree.clone();
    let mut levels = Vec::new();
    let mut processed = 0usize;

    while processed < steps.len() {
        let mut ready: Vec<&str> = remaining
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&name, _)| name)
            .collect();

        if ready.is_empty() {
            return Err(FlowError::CircularDependency);
        }

        ready.sort_unstable();

        for &name in &ready {
            remaining.remove(name);
            for &succ in &successors[name] {
                if let Some(deg) = remaining.get_mut(succ) {
                    *deg -= 1;
                }
            }
        }

        processed += ready.len();
        levels.push(ready.into_iter().map(str::to_string).collect());
    }

    Ok(levels)
}
