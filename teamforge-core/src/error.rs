//! ABOUTME: Error types shared across the teamforge workspace
//! ABOUTME: Provides CoreError and the crate-wide Result alias

use thiserror::Error;

/// Errors raised while building or reading the core data model.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("agent setup failed for step {step}: {message}")]
    Setup { step: String, message: String },

    #[error("agent execution failed: {message}")]
    Agent { message: String },
}

/// Convenience Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CoreError>;
