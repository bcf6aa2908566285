//! pollwatch-server - Election Incident Reporting service
//!
//! Single binary serving the citizen-facing reporting API: polling unit
//! catalog, incident report intake with media attachments, AI-assisted
//! classification, dashboard aggregates, and community voting.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pollwatch_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use pollwatch_server::classifier::select_classifier;
use pollwatch_server::services::MediaStore;
use pollwatch_server::{build_router, config, AppState};

/// Command-line arguments for pollwatch-server
#[derive(Parser, Debug)]
#[command(name = "pollwatch-server")]
#[command(about = "Election incident reporting service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5730", env = "POLLWATCH_PORT")]
    port: u16,

    /// Root folder for the database and media storage (overrides
    /// environment and config file resolution)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Populate an empty unit catalog with demonstration polling units
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollwatch_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting pollwatch-server (Election Incident Reporting)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build: {} ({} {})",
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    // Step 1: Resolve root folder
    let resolver = RootFolderResolver::new("server");
    let root_folder = match args.root_folder {
        Some(path) => {
            info!("Root folder from command line: {}", path.display());
            path
        }
        None => resolver.resolve(),
    };

    // Step 2: Create root folder directory if missing
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    // Step 3: Open or create database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let db = pollwatch_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    if args.seed_demo {
        let seeded = pollwatch_server::db::seed::seed_demo_units(&db).await?;
        if seeded > 0 {
            info!("Seeded {} demonstration polling units", seeded);
        } else {
            info!("Unit catalog already populated, demo seed skipped");
        }
    }

    // Step 4: Resolve classifier configuration (database > env > TOML)
    let toml_config = resolver.load_config_file().unwrap_or_default();
    let backend = config::resolve_classifier_backend(&db, &toml_config).await?;
    let openrouter_key = config::resolve_openrouter_api_key(&db, &toml_config).await?;
    let gemini_key = config::resolve_gemini_api_key(&db, &toml_config).await?;
    let classify_timeout = config::resolve_classify_timeout(&db).await?;

    let classifier =
        select_classifier(&backend, openrouter_key.as_deref(), gemini_key.as_deref());
    info!("Classifier backend: {}", classifier.name());
    info!("Classify timeout: {} ms", classify_timeout.as_millis());

    // Step 5: Prepare media storage
    let media_store = MediaStore::new(initializer.media_dir());
    media_store
        .ensure_directory_exists()
        .context("Failed to initialize media directory")?;
    info!("Media directory: {}", media_store.media_dir().display());

    // Create application state and router
    let state = AppState::new(db, classifier, media_store, classify_timeout);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
