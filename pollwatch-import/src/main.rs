//! pollwatch-import - Bulk polling unit import
//!
//! Reads a JSON array or CSV file of polling unit records and upserts
//! them into the unit catalog in fixed-size batches. Re-running with a
//! newer file refreshes coordinates and voter counts without disturbing
//! report aggregates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use pollwatch_common::config::{RootFolderInitializer, RootFolderResolver};
use pollwatch_import::importer::import_records;
use pollwatch_import::records::load_records;

/// Command-line arguments for pollwatch-import
#[derive(Parser, Debug)]
#[command(name = "pollwatch-import")]
#[command(about = "Bulk import of polling units from JSON or CSV")]
#[command(version)]
struct Args {
    /// Units file to import (.json or .csv)
    #[arg(short, long)]
    file: PathBuf,

    /// Database path (defaults to the database in the resolved root folder)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Records per transaction
    #[arg(long, default_value = "100")]
    batch_size: usize,

    /// Execute batches but roll back instead of committing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let records = load_records(&args.file)?;
    info!("Found {} units to import", records.len());

    let db_path = match args.db {
        Some(path) => path,
        None => {
            let resolver = RootFolderResolver::new("import");
            let initializer = RootFolderInitializer::new(resolver.resolve());
            initializer
                .ensure_directory_exists()
                .context("Failed to initialize root folder")?;
            initializer.database_path()
        }
    };
    info!("Database: {}", db_path.display());

    let pool = pollwatch_common::db::init_database(&db_path).await?;

    if args.dry_run {
        info!("Dry run: batches execute but roll back");
    }

    let summary = import_records(&pool, &records, args.batch_size, args.dry_run).await?;

    info!(
        "Import complete: {} imported, {} updated, {} failed",
        summary.imported, summary.updated, summary.failed
    );
    if summary.failed > 0 {
        anyhow::bail!("{} units failed to import", summary.failed);
    }

    Ok(())
}
