//! ABOUTME: Control-plane process entry point: discovers workers, binds the
//! ABOUTME: aggregate RPC surface, and runs until interrupted

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use teamforge_control::{router, AppState};
use teamforge_core::{RateLimiter, TokenBucketConfig};
use teamforge_registry::{discover_workers, Registry};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs the control plane: discovers workers under a directory and exposes
/// an aggregate + proxying RPC surface over them.
#[derive(Parser, Debug)]
#[command(name = "teamforge-control", about = "Fleet control plane for agentic workers")]
struct Args {
    /// Directory containing one subdirectory per worker, each with a config.yaml
    #[arg(long, env = "TEAMFORGE_WORKERS_DIR")]
    workers_dir: PathBuf,

    /// Shared secret required on the `x-api-key` header; unset disables auth
    #[arg(long, env = "TEAMFORGE_API_KEY")]
    api_key: Option<String>,

    /// RPC port; 0 lets the OS assign one
    #[arg(long, env = "TEAMFORGE_RPC_PORT", default_value_t = 8090)]
    rpc_port: u16,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Requests allowed per minute per source for the RPC surface
    #[arg(long, default_value_t = 120)]
    rate_limit_per_minute: u32,

    /// Seconds between background health-check passes over the registry
    #[arg(long, default_value_t = 30)]
    health_check_interval_secs: u64,
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

    let discovered = discover_workers(&args.workers_dir);
    info!(count = discovered.len(), dir = %args.workers_dir.display(), "discovered workers");
    let registry = Arc::new(Registry::from_discovered(discovered));

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

    let health_check_handle = {
        let registry = registry.clone();
        let cancel = cancel.clone();
        let interval = Duration::from_secs(args.health_check_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                registry.perform_health_checks().await;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        })
    };

    let state = AppState {
        registry: registry.clone(),
        api_key: args.api_key.clone(),
        rate_limiter: Arc::new(RateLimiter::new(TokenBucketConfig::per_minute(args.rate_limit_per_minute))),
    };
    let app = router::build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.rpc_port))
        .await
        .with_context(|| format!("binding RPC port {}", args.rpc_port))?;
    info!(addr = %listener.local_addr()?, "control plane RPC surface listening");

    tokio::select! {
        result = axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()) => {
            result.context("RPC server error")?;
        }
        _ = cancel.cancelled() => {
            info!("RPC surface shutting down");
        }
    }

    health_check_handle.await.context("health check loop task panicked")?;
    registry.close();
    Ok(())
}
