//! scriptdepot server
//!
//! Serves the signed script API over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use scriptdepot_auth::{AuthConfig, Verifier};
use scriptdepot_core::config::{Config, load_config};
use scriptdepot_core::tracing_init::init_tracing;
use scriptdepot_server::{AppState, DepotDatabase, RouterConfig, ToolService, build_router};

#[derive(Parser, Debug)]
#[command(name = "scriptdepot-server")]
#[command(version, about = "scriptdepot server - signed script storage with snapshots")]
struct Args {
    /// Path to a JSON settings file.
    #[arg(long, env = "SCRIPTDEPOT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Directory for snapshot artifacts.
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Require signatures on read-only endpoints.
    #[arg(long)]
    sign_reads: bool,

    /// Log level for scriptdepot crates (overridden by `RUST_LOG`).
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    /// Flags win over every other configuration layer.
    fn apply(self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.bind_addr = addr;
        }
        if let Some(path) = self.db_path {
            config.storage.database_path = Some(path);
        }
        if let Some(dir) = self.backup_dir {
            config.storage.backup_dir = Some(dir);
        }
        if self.sign_reads {
            config.auth.sign_reads = true;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    let level = &config.logging.level;
    init_tracing(
        &format!("scriptdepot_server={level},scriptdepot_core={level},tower_http={level}"),
        config.logging.json,
    );

    config.validate()?;
    if config.uses_dev_secret() {
        warn!("Using the built-in development HMAC secret; set SCRIPTDEPOT_HMAC_SECRET");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.bind_addr,
        environment = %config.environment,
        "Starting scriptdepot-server"
    );

    let db_path = config.database_path();
    info!(path = %db_path.display(), "Opening depot database");
    let db = DepotDatabase::open(&db_path).await?;

    let backup_dir = config.backup_dir();
    info!(path = %backup_dir.display(), "Snapshot artifacts directory");

    let service = ToolService::new(db, backup_dir, config.auth.sign_reads);
    let verifier = Verifier::new(
        AuthConfig::new(config.auth.hmac_secret.as_bytes())
            .with_replay_window_ms(config.auth.replay_window_ms),
    );
    let state = AppState::new(service, verifier)
        .with_database_path(db_path)
        .with_environment(config.environment);

    let app = build_router(state, &RouterConfig::from(&config.server));

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
