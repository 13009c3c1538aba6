//! ABOUTME: Worker process entry point: loads a worker config, binds the RPC
//! ABOUTME: surface, and runs the monitor loop until interrupted

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use teamforge_agents::DefaultAgentFactory;
use teamforge_core::model::Worker;
use teamforge_core::RateLimiter;
use teamforge_core::TokenBucketConfig;
use teamforge_flow::FlowExecutor;
use teamforge_runtime::WorkerRuntime;
use teamforge_templates::TemplateEvaluator;
use teamforge_worker::{router, AppState};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs one worker's monitor loop and RPC surface.
#[derive(Parser, Debug)]
#[command(name = "teamforge-worker", about = "Agentic flow worker process")]
struct Args {
    /// Path to the worker's config.yaml
    #[arg(long, env = "TEAMFORGE_CONFIG")]
    config: PathBuf,

    /// Directory the flow executes in; defaults to the config file's parent
    #[arg(long, env = "TEAMFORGE_WORKING_DIR")]
    working_dir: Option<PathBuf>,

    /// Shared secret required on the `x-api-key` header; unset disables auth
    #[arg(long, env = "TEAMFORGE_API_KEY")]
    api_key: Option<String>,

    /// RPC port; 0 lets the OS assign one. Ignored when --no-rpc is set
    #[arg(long, env = "TEAMFORGE_RPC_PORT", default_value_t = 8080)]
    rpc_port: u16,

    /// Disable the RPC surface entirely; only the monitor loop runs
    #[arg(long)]
    no_rpc: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Requests allowed per minute per source for the RPC surface
    #[arg(long, default_value_t = 120)]
    rate_limit_per_minute: u32,
}

fn setup_tracing(level: tracing::Level) {
    use std::io;
    use tracing_subscriber::EnvFilter;

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(args.log_level);

    let config_text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading config at {}", args.config.display()))?;
    let worker: Worker = serde_yaml::from_str(&config_text).context("parsing worker config")?;
    worker.validate().context("validating worker config")?;

    let settings = worker.effective_settings();
    let working_dir = args
        .working_dir
        .or_else(|| args.config.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&working_dir)
        .with_context(|| format!("creating working directory {}", working_dir.display()))?;

    let runtime = WorkerRuntime::init(worker.clone(), settings.clone(), working_dir.clone());

    let executor = FlowExecutor::new(
        settings.flow.clone(),
        working_dir.clone(),
        runtime.clone(),
        TemplateEvaluator::new(),
        Arc::new(DefaultAgentFactory),
        worker.name.clone(),
    )
    .context("validating flow DAG")?;

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received ctrl-c, shutting down");
                cancel.cancel();
            }
        });
    }

    let monitor_handle = {
        let runtime = runtime.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            teamforge_worker::monitor::run(executor, runtime, cancel).await;
        })
    };

    if !args.no_rpc {
        let state = AppState {
            runtime: runtime.clone(),
            api_key: args.api_key.clone(),
            rate_limiter: Arc::new(RateLimiter::new(TokenBucketConfig::per_minute(args.rate_limit_per_minute))),
        };
        let app = router::build_router(state);
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.rpc_port))
            .await
            .with_context(|| format!("binding RPC port {}", args.rpc_port))?;
        info!(addr = %listener.local_addr()?, "RPC surface listening");

        let cancel = cancel.clone();
        tokio::select! {
            result = axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()) => {
                result.context("RPC server error")?;
            }
            _ = cancel.cancelled() => {
                info!("RPC surface shutting down");
            }
        }
    }

    monitor_handle.await.context("monitor loop task panicked")?;
    Ok(())
}
