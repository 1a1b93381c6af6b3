//! Snapshot driver.
//!
//! Runs one full-population import: deactivation pre-pass, one
//! transaction per record, end-of-run orphan cleanup. Committing per
//! record bounds the blast radius of a single bad record; a crash mid-run
//! leaves the committed prefix durable and the rerun is idempotent.

use crate::error::{ImportError, UpsertError};
use crate::feed::{MemberRecord, RecordResult};
use crate::upsert::PersonImporter;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

/// Reference-entity kinds swept by the orphan cleanup. Groups and
/// countries are stable reference data and stay.
const ORPHAN_SWEEP: &[(&str, &str, &str)] = &[
    ("delegations", "delegation_roles", "delegation_id"),
    ("committees", "committee_roles", "committee_id"),
    ("organizations", "organization_roles", "organization_id"),
];

/// Counters for one import run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub orphans_removed: u64,
}

pub struct SnapshotDriver {
    pool: SqlitePool,
    importer: PersonImporter,
    progress_interval: usize,
}

impl SnapshotDriver {
    pub fn new(pool: SqlitePool, importer: PersonImporter) -> Self {
        Self {
            pool,
            importer,
            progress_interval: 50,
        }
    }

    /// Run one import over a decoded snapshot.
    pub async fn run(&self, records: Vec<RecordResult>) -> Result<ImportStats, ImportError> {
        let total = records.len();
        let mut stats = ImportStats::default();
        info!(records = total, "starting snapshot import");

        // Pre-pass: everyone is inactive until the snapshot names them
        // again.
        sqlx::query("UPDATE meps SET active = 0 WHERE active = 1")
            .execute(&self.pool)
            .await?;

        for (index, record) in records.into_iter().enumerate() {
            stats.processed += 1;

            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed record");
                    stats.skipped += 1;
                    continue;
                }
            };

            match self.import_one(&record).await {
                Ok(true) => stats.created += 1,
                Ok(false) => stats.updated += 1,
                Err(UpsertError::Record(e)) => {
                    warn!(ep_id = record.user_id, error = %e, "skipping record");
                    stats.skipped += 1;
                }
                Err(UpsertError::Database(e)) => {
                    error!(ep_id = record.user_id, error = %e, "record failed to persist");
                    stats.failed += 1;
                }
            }

            if stats.processed % self.progress_interval == 0 {
                info!(
                    processed = stats.processed,
                    total,
                    name = %record.display_name(),
                    "import progress"
                );
            }
        }

        stats.orphans_removed = self.remove_orphans().await?;

        info!(
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            failed = stats.failed,
            orphans_removed = stats.orphans_removed,
            "snapshot import finished"
        );

        Ok(stats)
    }

    /// Import one record in its own transaction. Returns whether the
    /// person was newly created. An error rolls back the transaction.
    async fn import_one(&self, record: &MemberRecord) -> Result<bool, UpsertError> {
        let mut tx = self.pool.begin().await?;
        let (_, created) = self.importer.upsert(&mut tx, record).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Delete reference entities left with zero linked persons.
    async fn remove_orphans(&self) -> Result<u64, ImportError> {
        let mut removed = 0;

        for &(table, link_table, link_column) in ORPHAN_SWEEP {
            let sql = format!(
                "DELETE FROM {table} WHERE guid NOT IN (SELECT DISTINCT {link_column} FROM {link_table})"
            );
            let result = sqlx::query(&sql).execute(&self.pool).await?;
            if result.rows_affected() > 0 {
                info!(
                    table,
                    removed = result.rows_affected(),
                    "removed orphaned reference entities"
                );
            }
            removed += result.rows_affected();
        }

        Ok(removed)
    }
}
