//! Kindred HTTP server
//!
//! # Usage
//!
//! ```bash
//! # Defaults from config/default.toml, overridden by KINDRED__* variables
//! kindred-server
//!
//! # Explicit config file and listener
//! kindred-server --config /etc/kindred.toml --bind 0.0.0.0 --port 8080
//!
//! # Debug logging
//! RUST_LOG=kindred_core=debug,kindred_search=debug kindred-server
//! ```
//!
//! Priority: CLI arguments > environment variables > config file > defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kindred_core::{CancelFlag, Config};
use kindred_search::{ElasticClient, ElasticProfileStore};
use kindred_server::{build_router, telemetry, AppState};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "kindred-server")]
#[command(version)]
#[command(about = "Similar-user recommendations over Elasticsearch")]
struct Args {
    /// TOML config file. Without it, config/ and KINDRED__* variables are used.
    #[arg(short, long, env = "KINDRED_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address override
    #[arg(long)]
    bind: Option<String>,

    /// Port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Skip creating the index at startup
    #[arg(long)]
    no_bootstrap: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    telemetry::init(&config.logging).map_err(|e| anyhow::anyhow!(e))?;

    info!(
        endpoint = %config.elastic.endpoint,
        index = %config.elastic.index,
        "Starting kindred-server"
    );

    let client = ElasticClient::new(config.elastic.clone())?;
    let store = Arc::new(ElasticProfileStore::new(client));

    if !args.no_bootstrap {
        match store.ensure_collection().await {
            Ok(true) => info!(index = %config.elastic.index, "Index created"),
            Ok(false) => info!(index = %config.elastic.index, "Index present"),
            Err(e) => warn!(error = %e, "Index bootstrap failed, continuing"),
        }
    }

    let state = AppState::new(store, &config)?;
    let cancel = state.pipeline.cancel_flag();

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .context("server error")?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal(cancel: CancelFlag) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, cancelling pending batches");
    cancel.cancel();
}
