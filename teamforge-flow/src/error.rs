//! ABOUTME: Errors raised while validating, leveling, or executing a flow
//! ABOUTME: Validation/leveling errors are fatal before any step executes

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow must declare at least one step")]
    EmptyFlow,

    #[error("step at index {index} is missing a name")]
    MissingName { index: usize },

    #[error("step `{name}` is missing a type")]
    MissingType { name: String },

    #[error("duplicate step name `{name}`")]
    DuplicateName { name: String },

    #[error("step `{step}` depends on unknown step `{dependency}`")]
    UnknownDependency { step: String, dependency: String },

    #[error("circular dependency detected")]
    CircularDependency,

    #[error("agent setup failed for step {step}: {message}")]
    Setup { step: String, message: String },

    #[error("step `{step}` failed: {message}")]
    StepFailed { step: String, message: String },
}

pub type Result<T> = std::result::Result<T, FlowError>;
