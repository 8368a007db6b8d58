//! trainrun Server
//!
//! Accepts training jobs over HTTP and answers progress queries for them.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trainrun_core::limits::SWEEP_INTERVAL;
use trainrun_server::{http, AppState, Config};

#[derive(Parser)]
#[command(name = "trainrun-server")]
#[command(about = "Training job server")]
#[command(version)]
struct Args {
    /// HTTP bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Project root holding models/, output/ and public/
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Interpreter used to run the training script
    #[arg(long)]
    python: Option<String>,

    /// Training script, relative to the base dir
    #[arg(long)]
    script: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::default();
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(base_dir) = self.base_dir {
            config.base_dir = base_dir;
        }
        if let Some(python) = self.python {
            config.python = python;
        }
        if let Some(script) = self.script {
            config.script = script;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Args::parse()
        .into_config()
        .with_absolute_base_dir()
        .map_err(|e| format!("Failed to resolve base directory: {}", e))?;
    let addr: SocketAddr = config.bind_addr.parse()?;

    info!(
        addr = %addr,
        base_dir = %config.base_dir.display(),
        script = %config.script_path().display(),
        "Starting trainrun server"
    );

    let state = AppState::new(&config);

    // Background sweep of finished and stalled progress entries
    let cancel = CancellationToken::new();
    let sweeper = state.registry.spawn_sweeper(SWEEP_INTERVAL, cancel.clone());

    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, http::create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    cancel.cancel();
    sweeper.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
