//! ABOUTME: Worker discovery, typed RPC client, and the control plane's worker registry
//! ABOUTME: Discovery is a pure filesystem scan; the registry owns reachability state

mod client;
mod discovery;
mod error;
mod registry;

pub use client::WorkerClient;
pub use discovery::{discover_workers, DiscoveredWorker};
pub use error::{RegistryError, Result};
pub use registry::{AggregateHealth, Registry, WorkerInfo, WorkerStatus};
