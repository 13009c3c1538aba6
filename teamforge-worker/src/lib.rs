//! ABOUTME: Worker process library: RPC surface, monitor loop, and shared state
//! ABOUTME: The binary in `main.rs` is a thin CLI wrapper around these pieces

pub mod handlers;
pub mod logs;
pub mod middleware;
pub mod monitor;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
