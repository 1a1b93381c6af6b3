//! epsync-mi - Member Import
//!
//! Refreshes the parliamentary-member dataset from a periodic bulk
//! snapshot dump: person upsert, wholesale role reconciliation per
//! role-kind, and end-of-run cleanup of orphaned reference entities.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use epsync_mi::aliases::GroupAliases;
use epsync_mi::driver::SnapshotDriver;
use epsync_mi::feed::{self, SnapshotFormat};
use epsync_mi::reconcile::RoleReconciler;
use epsync_mi::upsert::PersonImporter;

/// Update the member dataset from a snapshot dump.
#[derive(Debug, Parser)]
#[command(name = "epsync-mi", version)]
struct Args {
    /// Path to the snapshot dump (JSON array or bracketed line stream).
    snapshot: PathBuf,

    /// Root data folder (overrides EPSYNC_ROOT_FOLDER and the config
    /// file).
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Snapshot file format.
    #[arg(long, value_enum, default_value = "auto")]
    format: SnapshotFormat,
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

    info!("Starting epsync-mi (Member Import) v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = epsync_common::config::resolve_root_folder(args.root_folder.as_deref());
    epsync_common::config::ensure_root_folder(&root_folder)?;

    let db_path = epsync_common::config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let pool = epsync_common::db::init_database(&db_path).await?;

    let records = feed::read_snapshot(&args.snapshot, args.format)?;
    info!(
        records = records.len(),
        snapshot = %args.snapshot.display(),
        "snapshot loaded"
    );

    let importer = PersonImporter::new(RoleReconciler::new(GroupAliases::default()));
    let driver = SnapshotDriver::new(pool, importer);
    let stats = driver.run(records).await?;

    info!(
        created = stats.created,
        updated = stats.updated,
        skipped = stats.skipped,
        failed = stats.failed,
        "done"
    );

    Ok(())
}
