use anyhow::{Context, Result};
use clap::Parser;
use packrat::config::ServerConfig;
use packrat::web::{self, WebState};
use stash::{Repository, StashConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// The Packrat upload server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Storage root directory (overrides PACKRAT_STORAGE_ROOT)
    #[arg(long)]
    storage_root: Option<PathBuf>,

    /// Externally visible hostname for upload URLs (overrides PACKRAT_HOSTNAME)
    #[arg(long)]
    hostname: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let stash_config = match cli.storage_root {
        Some(root) => StashConfig::with_root(root),
        None => StashConfig::from_env()?,
    };
    tracing::info!("Storage root: {}", stash_config.root().display());

    let repo = Arc::new(Repository::open(stash_config).context("Failed to open repository")?);

    let server_config = match cli.hostname {
        Some(hostname) => ServerConfig::with_hostname(hostname),
        None => ServerConfig::from_env(),
    };
    tracing::info!("Public hostname: {}", server_config.hostname);

    let state = WebState {
        repo,
        hostname: server_config.hostname,
    };
    let app = web::router(state).layer(TraceLayer::new_for_http());

    let bind_addr = std::net::SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!("Listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    Ok(())
}
