use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use corewatch_app::{Application, ApplicationConfig};
use corewatch_monitor::{init_tracing, LoggingConfig};

/// corewatch: the account-isolation engine host for the multi-account chat
/// shell. Serves the IPC Surface the shell talks to and supervises one
/// worker process per account.
#[derive(Parser, Debug)]
#[command(name = "corewatch", author, version, about)]
struct Args {
    /// Overrides COREWATCH_USER_DATA_DIR / the OS default data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Address the IPC Surface listens on.
    #[arg(long, default_value = "127.0.0.1:4317")]
    bind: SocketAddr,

    /// Log level used when RUST_LOG isn't set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit one JSON object per log line instead of the human-readable
    /// formatter.
    #[arg(long)]
    json_logs: bool,

    /// Maximum number of concurrently running account instances.
    #[arg(long, default_value_t = corewatch_supervisor::DEFAULT_MAX_INSTANCES)]
    max_instances: usize,

    /// Internal: run as the per-account worker-host placeholder instead of
    /// the shell-facing server. The Instance Supervisor's default spawner
    /// launches this binary with this flag once per account; an embedding
    /// toolkit's own renderer-host binary replaces it in a full desktop
    /// build.
    #[arg(long, hide = true)]
    worker_host: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.worker_host {
        return run_worker_host().await;
    }

    init_tracing(LoggingConfig::default().with_default_level(args.log_level).with_json(args.json_logs));

    let mut config = ApplicationConfig::default();
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    config.bind_addr = args.bind;
    config.supervisor.max_instances = args.max_instances;

    let app = Application::start(config).await?;
    let bind_addr = app.bind_addr();
    let router = app.router();

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, data_dir = %app.data_dir().display(), "corewatch listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    app.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

/// Minimal worker-host loop used by the default `ProcessWorkerSpawner` when
/// no embedding toolkit is wired in: stays alive until asked to exit.
async fn run_worker_host() -> anyhow::Result<()> {
    let _ = tokio::signal::ctrl_c().await;
    Ok(())
}
