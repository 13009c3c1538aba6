//! ABOUTME: Control-plane library: aggregate/proxied RPC surface over the worker registry
//! ABOUTME: The binary in `main.rs` is a thin CLI wrapper around these pieces

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::{Result, RpcError};
pub use router::build_router;
pub use state::AppState;
