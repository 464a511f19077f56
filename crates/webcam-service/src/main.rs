//! Webcam Service - Acquisition scheduler and HTTP gallery.
//!
//! Run with: `cargo run -p webcam-service`

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use webcam_core::HttpSource;
use webcam_service::{AcquisitionScheduler, AppState, Config, api};
use webcam_store::ImageStore;

/// Webcam Service - Acquisition scheduler and HTTP gallery.
#[derive(Parser, Debug)]
#[command(name = "webcam-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory for original images (overrides config).
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Directory for thumbnails (overrides config).
    #[arg(long)]
    thumbnails_dir: Option<PathBuf>,

    /// Disable the acquisition scheduler (gallery only mode).
    #[arg(long)]
    no_collector: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("webcam_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(dir) = args.images_dir {
        config.storage.images_dir = dir;
    }
    if let Some(dir) = args.thumbnails_dir {
        config.storage.thumbnails_dir = dir;
    }
    config.validate()?;

    let location = config.location.location()?;
    let store = Arc::new(ImageStore::open(
        &config.storage.images_dir,
        &config.storage.thumbnails_dir,
        config.thumbnails.options(),
    )?);

    // Start the acquisition scheduler
    if !args.no_collector {
        let source = HttpSource::new(&config.source.url, config.source.timeout())?;
        AcquisitionScheduler::new(Arc::new(source), Arc::clone(&store), location)
            .with_policy(config.schedule.policy())
            .with_settle_delay(config.source.settle_delay())
            .start();
    } else {
        info!("Acquisition scheduler disabled");
    }

    let state = AppState::new(store, location);

    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
