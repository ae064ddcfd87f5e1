//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//!
//! Tickets are stored document-style: scalar fields get their own columns so
//! the store can filter and aggregate server-side, while the event history
//! stays embedded as a JSON array (queried with json_each where a pipeline
//! would unwind it). The custom index set carries the names the migration
//! tool enumerates and recreates on the target deployment.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: tickets + classifiers collections and the custom index set
    r#"
    CREATE TABLE IF NOT EXISTS tickets (
        id                   TEXT PRIMARY KEY,
        title                TEXT NOT NULL,
        description          TEXT NOT NULL,
        current_state        TEXT NOT NULL,
        classification       TEXT NOT NULL,
        created_at           DATETIME NOT NULL,
        created_by           TEXT NOT NULL,
        assigned_to          TEXT,

        -- Derived fields (projected from history, refreshable)
        reopen_count         INTEGER NOT NULL DEFAULT 0,
        state_change_count   INTEGER NOT NULL DEFAULT 0,
        comment_count        INTEGER NOT NULL DEFAULT 0,
        closed_at            DATETIME,
        last_state_change_at DATETIME,
        last_modified_at     DATETIME,

        -- Embedded event history (append-only, chronological order)
        history              JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS classifiers (
        id        TEXT PRIMARY KEY,
        name      TEXT NOT NULL,
        level     INTEGER NOT NULL,
        parent_id TEXT,
        ancestors JSON NOT NULL
    );

    -- Custom indexes; names must survive migration between deployments
    CREATE INDEX IF NOT EXISTS idx_created_at ON tickets(created_at);
    CREATE INDEX IF NOT EXISTS idx_current_state ON tickets(current_state);
    CREATE INDEX IF NOT EXISTS idx_closed_at ON tickets(closed_at);
    CREATE INDEX IF NOT EXISTS idx_classification ON tickets(classification);
    CREATE INDEX IF NOT EXISTS idx_created_at_current_state ON tickets(created_at, current_state);
    CREATE INDEX IF NOT EXISTS idx_created_at_closed_at ON tickets(created_at, closed_at);
    CREATE INDEX IF NOT EXISTS idx_current_state_classification ON tickets(current_state, classification);
    CREATE INDEX IF NOT EXISTS idx_complex_filter ON tickets(created_at, current_state, classification);
    CREATE INDEX IF NOT EXISTS idx_last_modified_at_desc ON tickets(last_modified_at DESC);
    CREATE INDEX IF NOT EXISTS idx_assigned_to_current_state ON tickets(assigned_to, current_state);

    CREATE INDEX IF NOT EXISTS idx_classifiers_parent ON classifiers(parent_id);
    CREATE INDEX IF NOT EXISTS idx_classifiers_level_name ON classifiers(level, name);
    "#,
];

/// Collections this schema defines, in migration order.
pub const COLLECTIONS: &[&str] = &["tickets", "classifiers"];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Run migrations twice - should be idempotent
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in COLLECTIONS {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_custom_indexes_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type='index' AND tbl_name='tickets' AND sql IS NOT NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 10, "tickets should carry 10 custom indexes");

        let exists: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_complex_filter'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1);
    }
}
