//! Cross-deployment migration
//!
//! Copies the tickets and classifiers collections from a source database to
//! a target: per collection, drop-then-insert of all documents followed by a
//! separate pass that recreates every custom index under its original name
//! (the implicit primary-key indexes are skipped). The two passes are not
//! atomic: a crash in between leaves the target data-complete but
//! index-incomplete, which only the verification step surfaces.
//!
//! Verification compares per-collection document counts. A mismatch is
//! reported as a warning, never auto-corrected; index creation failures are
//! isolated per index and do not abort the rest of the migration.

use crate::db::{Database, COLLECTIONS};
use crate::error::{Error, Result};

/// Migration outcome for one collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub name: String,
    pub source_count: i64,
    pub target_count: i64,
    pub documents_copied: usize,
    pub indexes_copied: usize,
    /// Per-index failures: "index_name: error"
    pub index_failures: Vec<String>,
    /// Empty source collections are skipped, not dropped on the target
    pub skipped_empty: bool,
}

impl CollectionReport {
    /// Post-migration count check for this collection.
    pub fn counts_match(&self) -> bool {
        self.source_count == self.target_count
    }
}

/// Full migration report: one entry per collection plus the overall verdict.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub collections: Vec<CollectionReport>,
}

impl MigrationReport {
    /// True when every collection's counts match.
    pub fn passed(&self) -> bool {
        self.collections.iter().all(CollectionReport::counts_match)
    }
}

/// Migrate every collection from `source` to `target`.
///
/// The target schema is migrated up front; document copy then index
/// recreation then count verification, per collection.
pub fn migrate_database(source: &Database, target: &Database) -> Result<MigrationReport> {
    target.migrate()?;

    let mut report = MigrationReport::default();
    for collection in COLLECTIONS {
        report.collections.push(migrate_collection(source, target, collection)?);
    }

    if report.passed() {
        tracing::info!("Migration verification passed");
    } else {
        tracing::warn!("Migration verification found count mismatches");
    }

    Ok(report)
}

fn migrate_collection(
    source: &Database,
    target: &Database,
    collection: &str,
) -> Result<CollectionReport> {
    let mut report = CollectionReport {
        name: collection.to_string(),
        ..Default::default()
    };

    report.source_count = source.count_collection(collection)?;
    tracing::info!(collection, count = report.source_count, "Migrating collection");

    if report.source_count == 0 {
        report.skipped_empty = true;
        report.target_count = target.count_collection(collection)?;
        tracing::info!(collection, "Source collection empty, skipping");
        return Ok(report);
    }

    report.documents_copied = copy_documents(source, target, collection)?;

    // Separate index pass; each failure is isolated and reported.
    for index in source.list_custom_indexes(collection)? {
        match target.apply_index(&index) {
            Ok(()) => report.indexes_copied += 1,
            Err(e) => {
                tracing::warn!(
                    collection,
                    index = %index.name,
                    error = %e,
                    "Failed to recreate index"
                );
                report.index_failures.push(format!("{}: {}", index.name, e));
            }
        }
    }

    report.target_count = target.count_collection(collection)?;
    Ok(report)
}

fn copy_documents(source: &Database, target: &Database, collection: &str) -> Result<usize> {
    match collection {
        "tickets" => {
            let documents = source.list_all_tickets()?;
            target.replace_all_tickets(&documents)
        }
        "classifiers" => {
            let documents = source.list_classifiers()?;
            target.replace_all_classifiers(&documents)
        }
        other => Err(Error::Migration(format!("unknown collection: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::IndexSpec;
    use crate::seed::{seed_database, SeedOptions};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_round_trip_counts_and_indexes() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = Database::open(&dir.path().join("source.db")).unwrap();
        source.migrate().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        seed_database(
            &source,
            &mut rng,
            &SeedOptions {
                count: 25,
                base_time: "2025-10-01T00:00:00Z".parse().unwrap(),
            },
            |_, _| {},
        )
        .unwrap();

        let target = Database::open(&dir.path().join("target.db")).unwrap();
        let report = migrate_database(&source, &target).unwrap();

        assert!(report.passed());
        for collection in &report.collections {
            assert_eq!(collection.source_count, collection.target_count);
            assert!(collection.index_failures.is_empty());
        }

        // Documents survive the copy intact.
        let sample = source.list_all_tickets().unwrap().into_iter().next().unwrap();
        let copied = target.get_ticket(&sample.id).unwrap().expect("copied ticket");
        assert_eq!(copied.history.len(), sample.history.len());
        assert_eq!(copied.current_state, sample.current_state);
        assert_eq!(copied.closed_at, sample.closed_at);

        // Every custom index name present in source exists in target.
        for collection in COLLECTIONS {
            let source_names: Vec<String> = source
                .list_custom_indexes(collection)
                .unwrap()
                .into_iter()
                .map(|i| i.name)
                .collect();
            let target_names: Vec<String> = target
                .list_custom_indexes(collection)
                .unwrap()
                .into_iter()
                .map(|i| i.name)
                .collect();
            for name in &source_names {
                assert!(
                    target_names.contains(name),
                    "index {} missing from target {}",
                    name,
                    collection
                );
            }
        }
    }

    #[test]
    fn test_empty_source_collection_is_skipped() {
        let source = Database::open_in_memory().unwrap();
        source.migrate().unwrap();
        let target = Database::open_in_memory().unwrap();

        let report = migrate_database(&source, &target).unwrap();
        assert!(report.passed());
        assert!(report.collections.iter().all(|c| c.skipped_empty));
    }

    #[test]
    fn test_index_failure_is_isolated() {
        let source = Database::open_in_memory().unwrap();
        source.migrate().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        seed_database(
            &source,
            &mut rng,
            &SeedOptions {
                count: 5,
                base_time: "2025-10-01T00:00:00Z".parse().unwrap(),
            },
            |_, _| {},
        )
        .unwrap();

        let target = Database::open_in_memory().unwrap();
        target.migrate().unwrap();

        // A malformed spec fails on its own; the rest still land.
        let bad = IndexSpec {
            name: "idx_bogus".into(),
            sql: "CREATE INDEX idx_bogus ON tickets(no_such_column)".into(),
        };
        assert!(target.apply_index(&bad).is_err());

        let report = migrate_database(&source, &target).unwrap();
        assert!(report.passed());
        let tickets = report
            .collections
            .iter()
            .find(|c| c.name == "tickets")
            .unwrap();
        assert!(tickets.indexes_copied >= 10);
    }
}
