//! ABOUTME: Core data model, error types, and the agent adapter trait for teamforge
//! ABOUTME: Depended on by every other crate in the workspace

pub mod agent;
pub mod error;
pub mod model;
pub mod ratelimit;
pub mod rpc;

pub use agent::{Agent, AgentFactory, AgentOutput, AgentSpec, Configurable, RunOptions};
pub use error::{CoreError, Result};
pub use model::{
    Backoff, DependencyPolicy, FlowResult, FlowStats, FlowStep, HookSet, McpServerSpec,
    RetryConfig, StepOutput, StepStats, Worker, WorkerSettings,
};
pub use ratelimit::{RateLimiter, TokenBucketConfig};
pub use rpc::{ConfigResponse, HealthCheck, HealthResponse};
