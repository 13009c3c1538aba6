//! ABOUTME: Error type for worker discovery, registry lookups, and proxied RPC calls

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("worker {id} not found")]
    NotFound { id: String },

    #[error("worker {id} is unreachable: {message}")]
    Unreachable { id: String, message: String },

    #[error("io error reading workers directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
