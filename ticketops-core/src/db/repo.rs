//! Database repository layer
//!
//! Query and mutation operations for the tickets and classifiers
//! collections, including the aggregation surface the dashboard consumes.
//! Aggregations run server-side in SQLite: scalar filters hit the indexed
//! columns, history-scoped queries unwind the embedded JSON history with
//! `json_each`, and day arithmetic uses `julianday`.

use crate::analytics::{
    ClassifierScope, DateRange, ResolutionStats, ReopeningStats, StateFilter, TrendPoint,
};
use crate::error::{Error, Result};
use crate::types::{ActionEntry, Classifications, Classifier, DerivedFields, Ticket, TicketState};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// A custom index on a collection: its name and the SQL that creates it.
///
/// Only explicitly created indexes carry SQL in `sqlite_master`; the
/// implicit primary-key indexes do not, which is how the migration skips
/// them.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: String,
    pub sql: String,
}

/// Which state transition a history-unwinding count looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// `state_change` with `to == closed`
    Closure,
    /// `state_change` with `from == closed` and `to != closed`
    Reopening,
}

/// Raw ticket parts for the derived-field refresh.
///
/// The refresh parses the history itself so a malformed document fails in
/// isolation instead of aborting the whole batch.
#[derive(Debug, Clone)]
pub struct RawTicketHistory {
    pub id: String,
    pub current_state: String,
    pub created_at: String,
    pub history_json: String,
}

/// Aggregate statistics over the derived fields, for the refresh report.
#[derive(Debug, Clone, Default)]
pub struct DerivedFieldStats {
    pub total_reopenings: i64,
    pub tickets_with_reopenings: i64,
    pub max_reopenings: i64,
    pub closed_state_count: i64,
    pub closed_at_present_count: i64,
    pub total_comments: i64,
    pub avg_comments: f64,
    pub max_comments: i64,
    pub total_state_changes: i64,
    pub avg_state_changes: f64,
    pub max_state_changes: i64,
}

/// Database handle: one shared connection kept alive for the process
/// lifetime.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Ticket operations
    // ============================================

    /// Insert a ticket document.
    pub fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        insert_ticket_into(&conn, ticket)
    }

    /// Get a ticket by id.
    pub fn get_ticket(&self, id: &str) -> Result<Option<Ticket>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM tickets WHERE id = ?", [id], row_to_ticket)
            .optional()
            .map_err(Error::from)
    }

    /// All tickets in the collection, in id order.
    pub fn list_all_tickets(&self) -> Result<Vec<Ticket>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM tickets ORDER BY id")?;
        let rows = stmt
            .query_map([], row_to_ticket)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Drop-then-insert the whole tickets collection. Returns the number of
    /// documents written.
    pub fn replace_all_tickets(&self, tickets: &[Ticket]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM tickets", [])?;
        for ticket in tickets {
            insert_ticket_into(&tx, ticket)?;
        }
        tx.commit()?;
        Ok(tickets.len())
    }

    /// Write the derived fields of one ticket.
    ///
    /// Absent values clear the column, so the stored document always matches
    /// the projection exactly and re-running the refresh is a no-op.
    pub fn update_derived_fields(&self, id: &str, derived: &DerivedFields) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            r#"
            UPDATE tickets SET
                reopen_count = ?1,
                state_change_count = ?2,
                comment_count = ?3,
                closed_at = ?4,
                last_state_change_at = ?5,
                last_modified_at = ?6
            WHERE id = ?7
            "#,
            params![
                derived.reopen_count,
                derived.state_change_count,
                derived.comment_count,
                derived.closed_at.map(|t| t.to_rfc3339()),
                derived.last_state_change_at.map(|t| t.to_rfc3339()),
                derived.last_modified_at.map(|t| t.to_rfc3339()),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::TicketNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Raw (id, state, created_at, history) rows for the refresh pass.
    pub fn list_raw_histories(&self) -> Result<Vec<RawTicketHistory>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, current_state, created_at, history FROM tickets ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawTicketHistory {
                    id: row.get(0)?,
                    current_state: row.get(1)?,
                    created_at: row.get(2)?,
                    history_json: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Number of tickets that already carry derived fields.
    pub fn count_with_derived_fields(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tickets WHERE last_modified_at IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    /// Document count of a named collection.
    pub fn count_collection(&self, collection: &str) -> Result<i64> {
        if !super::schema::COLLECTIONS.contains(&collection) {
            return Err(Error::Config(format!("unknown collection: {}", collection)));
        }
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection),
            [],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    // ============================================
    // Classifier operations
    // ============================================

    /// Insert a classifier node.
    pub fn insert_classifier(&self, classifier: &Classifier) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        insert_classifier_into(&conn, classifier)
    }

    /// Get a classifier by id.
    pub fn get_classifier(&self, id: &str) -> Result<Option<Classifier>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM classifiers WHERE id = ?",
            [id],
            row_to_classifier,
        )
        .optional()
        .map_err(Error::from)
    }

    /// All classifiers, in id order.
    pub fn list_classifiers(&self) -> Result<Vec<Classifier>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM classifiers ORDER BY id")?;
        let rows = stmt
            .query_map([], row_to_classifier)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Drop-then-insert the whole classifiers collection.
    pub fn replace_all_classifiers(&self, classifiers: &[Classifier]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM classifiers", [])?;
        for classifier in classifiers {
            insert_classifier_into(&tx, classifier)?;
        }
        tx.commit()?;
        Ok(classifiers.len())
    }

    /// Classifiers selectable in the dashboard: level >= 2, name ascending.
    /// The All sentinel is prepended by the presentation layer.
    pub fn selectable_classifiers(&self) -> Result<Vec<Classifier>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM classifiers WHERE level >= 2 ORDER BY name ASC")?;
        let rows = stmt
            .query_map([], row_to_classifier)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Ids of every classifier that lists `node_id` among its ancestors, at
    /// any depth.
    pub fn descendant_classifier_ids(&self, node_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id
            FROM classifiers c
            WHERE EXISTS (
                SELECT 1 FROM json_each(c.ancestors) a WHERE a.value = ?
            )
            ORDER BY c.id
            "#,
        )?;
        let rows = stmt
            .query_map([node_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
    }

    // ============================================
    // Aggregation surface (one query per dashboard widget)
    // ============================================

    /// Tickets created inside the window, under the given filters.
    pub fn count_created_in_range(
        &self,
        range: &DateRange,
        state: StateFilter,
        scope: &ClassifierScope,
    ) -> Result<i64> {
        let mut sql =
            String::from("SELECT COUNT(*) FROM tickets WHERE created_at >= ? AND created_at <= ?");
        let mut params = range_params(range);
        push_state_filter(&mut sql, &mut params, state);
        push_classifier_scope(&mut sql, &mut params, "classification", scope);

        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(&sql, params_from_iter(params), |r| r.get(0))?;
        Ok(count)
    }

    /// Sum of the denormalized reopen counters over the matched tickets.
    pub fn sum_reopenings_in_range(
        &self,
        range: &DateRange,
        state: StateFilter,
        scope: &ClassifierScope,
    ) -> Result<i64> {
        let mut sql = String::from(
            "SELECT COALESCE(SUM(reopen_count), 0) FROM tickets
             WHERE created_at >= ? AND created_at <= ?",
        );
        let mut params = range_params(range);
        push_state_filter(&mut sql, &mut params, state);
        push_classifier_scope(&mut sql, &mut params, "classification", scope);

        let conn = self.conn.lock().unwrap();
        let sum = conn.query_row(&sql, params_from_iter(params), |r| r.get(0))?;
        Ok(sum)
    }

    /// Ticket counts grouped by leaf classifier, descending, capped.
    pub fn classifier_counts(
        &self,
        range: &DateRange,
        state: StateFilter,
        scope: &ClassifierScope,
        limit: usize,
    ) -> Result<Vec<(String, i64)>> {
        let mut sql = String::from(
            "SELECT classification, COUNT(*) as cnt FROM tickets
             WHERE created_at >= ? AND created_at <= ?",
        );
        let mut params = range_params(range);
        push_state_filter(&mut sql, &mut params, state);
        push_classifier_scope(&mut sql, &mut params, "classification", scope);
        sql.push_str(" GROUP BY classification ORDER BY cnt DESC LIMIT ?");
        params.push(Value::from(limit as i64));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Daily creation counts inside the window, ascending by day.
    pub fn creation_trend(
        &self,
        range: &DateRange,
        state: StateFilter,
        scope: &ClassifierScope,
    ) -> Result<Vec<TrendPoint>> {
        let mut sql = String::from(
            "SELECT date(created_at) as day, COUNT(*) FROM tickets
             WHERE created_at >= ? AND created_at <= ?",
        );
        let mut params = range_params(range);
        push_state_filter(&mut sql, &mut params, state);
        push_classifier_scope(&mut sql, &mut params, "classification", scope);
        sql.push_str(" GROUP BY day ORDER BY day ASC");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(day, count)| {
                NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .ok()
                    .map(|day| TrendPoint { day, count })
            })
            .collect())
    }

    /// Resolution time statistics in floating-point days.
    ///
    /// The window applies to `created_at` while `closed_at` only has to be
    /// present; the original dashboard's semantics, kept as-is.
    pub fn resolution_stats(
        &self,
        range: &DateRange,
        state: StateFilter,
        scope: &ClassifierScope,
    ) -> Result<Option<ResolutionStats>> {
        let mut sql = String::from(
            "SELECT AVG(julianday(closed_at) - julianday(created_at)),
                    MIN(julianday(closed_at) - julianday(created_at)),
                    MAX(julianday(closed_at) - julianday(created_at))
             FROM tickets
             WHERE closed_at IS NOT NULL
               AND created_at >= ? AND created_at <= ?",
        );
        let mut params = range_params(range);
        push_state_filter(&mut sql, &mut params, state);
        push_classifier_scope(&mut sql, &mut params, "classification", scope);

        let conn = self.conn.lock().unwrap();
        let row: (Option<f64>, Option<f64>, Option<f64>) =
            conn.query_row(&sql, params_from_iter(params), |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })?;

        Ok(match row {
            (Some(mean), Some(min), Some(max)) => Some(ResolutionStats {
                mean_days: mean,
                min_days: min,
                max_days: max,
            }),
            _ => None,
        })
    }

    /// Split of tickets with vs without reopenings.
    ///
    /// Scoped by state and classifier only; the original computes this over
    /// the whole collection regardless of the date window.
    pub fn reopening_split(
        &self,
        state: StateFilter,
        scope: &ClassifierScope,
    ) -> Result<ReopeningStats> {
        let mut total_sql = String::from("SELECT COUNT(*) FROM tickets WHERE 1 = 1");
        let mut total_params = Vec::new();
        push_state_filter(&mut total_sql, &mut total_params, state);
        push_classifier_scope(&mut total_sql, &mut total_params, "classification", scope);

        let mut with_sql = String::from("SELECT COUNT(*) FROM tickets WHERE reopen_count > 0");
        let mut with_params = Vec::new();
        push_state_filter(&mut with_sql, &mut with_params, state);
        push_classifier_scope(&mut with_sql, &mut with_params, "classification", scope);

        let conn = self.conn.lock().unwrap();
        let total: i64 = conn.query_row(&total_sql, params_from_iter(total_params), |r| r.get(0))?;
        let with_reopenings: i64 =
            conn.query_row(&with_sql, params_from_iter(with_params), |r| r.get(0))?;

        Ok(ReopeningStats {
            with_reopenings,
            without_reopenings: total - with_reopenings,
            total,
        })
    }

    /// Count matching state transitions by unwinding the embedded history.
    ///
    /// Counts events, not tickets: a ticket with three in-period reopenings
    /// contributes three. The optional window applies to the event's own
    /// timestamp.
    pub fn count_transitions(
        &self,
        range: Option<&DateRange>,
        scope: &ClassifierScope,
        kind: TransitionKind,
    ) -> Result<i64> {
        let mut sql = String::from(
            "SELECT COUNT(*)
             FROM tickets t, json_each(t.history) e
             WHERE json_extract(e.value, '$.action') = 'state_change'",
        );
        match kind {
            TransitionKind::Closure => {
                sql.push_str(" AND json_extract(e.value, '$.to') = 'closed'");
            }
            TransitionKind::Reopening => {
                sql.push_str(
                    " AND json_extract(e.value, '$.from') = 'closed'
                      AND json_extract(e.value, '$.to') != 'closed'",
                );
            }
        }
        let mut params = Vec::new();
        if let Some(range) = range {
            sql.push_str(
                " AND julianday(json_extract(e.value, '$.timestamp')) >= julianday(?)
                  AND julianday(json_extract(e.value, '$.timestamp')) <= julianday(?)",
            );
            params.extend(range_params(range));
        }
        push_classifier_scope(&mut sql, &mut params, "t.classification", scope);

        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(&sql, params_from_iter(params), |r| r.get(0))?;
        Ok(count)
    }

    /// Tickets active at any point during the window: created before its end
    /// and not closed before its start. An overlap test, not a creation
    /// filter.
    pub fn active_tickets(
        &self,
        range: &DateRange,
        state: StateFilter,
        scope: &ClassifierScope,
        limit: usize,
    ) -> Result<Vec<Ticket>> {
        let mut sql = String::from(
            "SELECT * FROM tickets
             WHERE created_at < ?
               AND (closed_at IS NULL OR closed_at >= ?)",
        );
        let mut params = vec![
            Value::from(range.end.to_rfc3339()),
            Value::from(range.start.to_rfc3339()),
        ];
        push_state_filter(&mut sql, &mut params, state);
        push_classifier_scope(&mut sql, &mut params, "classification", scope);
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");
        params.push(Value::from(limit as i64));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), row_to_ticket)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Unwind histories into individual actions inside the window, most
    /// recent first, capped.
    pub fn recent_actions(
        &self,
        range: &DateRange,
        scope: &ClassifierScope,
        limit: usize,
    ) -> Result<Vec<ActionEntry>> {
        let mut sql = String::from(
            "SELECT t.id, t.title,
                    json_extract(e.value, '$.action'),
                    json_extract(e.value, '$.timestamp'),
                    json_extract(e.value, '$.userId'),
                    json_extract(e.value, '$.from'),
                    json_extract(e.value, '$.to')
             FROM tickets t, json_each(t.history) e
             WHERE julianday(json_extract(e.value, '$.timestamp')) >= julianday(?)
               AND julianday(json_extract(e.value, '$.timestamp')) <= julianday(?)",
        );
        let mut params = range_params(range);
        push_classifier_scope(&mut sql, &mut params, "t.classification", scope);
        sql.push_str(
            " ORDER BY julianday(json_extract(e.value, '$.timestamp')) DESC LIMIT ?",
        );
        params.push(Value::from(limit as i64));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                Ok(ActionEntry {
                    ticket_id: row.get(0)?,
                    title: row.get(1)?,
                    action: row.get(2)?,
                    timestamp: parse_datetime(&row.get::<_, String>(3)?),
                    user_id: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    from: row
                        .get::<_, Option<String>>(5)?
                        .and_then(|s| s.parse().ok()),
                    to: row
                        .get::<_, Option<String>>(6)?
                        .and_then(|s| s.parse().ok()),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ============================================
    // Whole-collection breakdowns (seed / refresh reports)
    // ============================================

    /// Ticket counts per state, descending.
    pub fn state_breakdown(&self) -> Result<Vec<(TicketState, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT current_state, COUNT(*) as cnt FROM tickets
             GROUP BY current_state ORDER BY cnt DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(state, count)| state.parse::<TicketState>().ok().map(|s| (s, count)))
            .collect())
    }

    /// Ticket counts per leaf classifier, descending.
    pub fn classification_breakdown(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT classification, COUNT(*) as cnt FROM tickets
             GROUP BY classification ORDER BY cnt DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Aggregates over the derived fields, for the refresh report.
    pub fn derived_field_stats(&self) -> Result<DerivedFieldStats> {
        let conn = self.conn.lock().unwrap();

        let (total_reopenings, tickets_with_reopenings, max_reopenings): (i64, i64, i64) = conn
            .query_row(
                "SELECT COALESCE(SUM(reopen_count), 0),
                        COALESCE(SUM(CASE WHEN reopen_count > 0 THEN 1 ELSE 0 END), 0),
                        COALESCE(MAX(reopen_count), 0)
                 FROM tickets",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;

        let closed_state_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tickets WHERE current_state = 'closed'",
            [],
            |r| r.get(0),
        )?;
        let closed_at_present_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tickets WHERE closed_at IS NOT NULL",
            [],
            |r| r.get(0),
        )?;

        let (total_comments, avg_comments, max_comments): (i64, f64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(comment_count), 0),
                    COALESCE(AVG(comment_count), 0.0),
                    COALESCE(MAX(comment_count), 0)
             FROM tickets",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;

        let (total_state_changes, avg_state_changes, max_state_changes): (i64, f64, i64) = conn
            .query_row(
                "SELECT COALESCE(SUM(state_change_count), 0),
                        COALESCE(AVG(state_change_count), 0.0),
                        COALESCE(MAX(state_change_count), 0)
                 FROM tickets",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;

        Ok(DerivedFieldStats {
            total_reopenings,
            tickets_with_reopenings,
            max_reopenings,
            closed_state_count,
            closed_at_present_count,
            total_comments,
            avg_comments,
            max_comments,
            total_state_changes,
            avg_state_changes,
            max_state_changes,
        })
    }

    // ============================================
    // Index enumeration (migration support)
    // ============================================

    /// Custom indexes of a collection, by name. The implicit primary-key
    /// indexes carry no SQL and are excluded.
    pub fn list_custom_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT name, sql FROM sqlite_master
             WHERE type = 'index' AND tbl_name = ? AND sql IS NOT NULL
             ORDER BY name",
        )?;
        let rows = stmt
            .query_map([collection], |row| {
                Ok(IndexSpec {
                    name: row.get(0)?,
                    sql: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Recreate one index from its stored spec, replacing any same-named
    /// index.
    pub fn apply_index(&self, spec: &IndexSpec) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(&format!("DROP INDEX IF EXISTS \"{}\"", spec.name))?;
        conn.execute_batch(&spec.sql)?;
        Ok(())
    }
}

// ============================================
// Row mapping and filter composition
// ============================================

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

fn row_to_ticket(row: &Row) -> rusqlite::Result<Ticket> {
    let state_str: String = row.get("current_state")?;
    let current_state: TicketState = state_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })?;

    let history_json: String = row.get("history")?;
    let history = serde_json::from_str(&history_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Ticket {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        current_state,
        current_classifications: Classifications {
            request_type: row.get("classification")?,
        },
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        created_by: row.get("created_by")?,
        assigned_to: row.get("assigned_to")?,
        history,
        reopen_count: row.get("reopen_count")?,
        state_change_count: row.get("state_change_count")?,
        comment_count: row.get("comment_count")?,
        closed_at: parse_datetime_opt(row.get("closed_at")?),
        last_state_change_at: parse_datetime_opt(row.get("last_state_change_at")?),
        last_modified_at: parse_datetime_opt(row.get("last_modified_at")?),
    })
}

fn row_to_classifier(row: &Row) -> rusqlite::Result<Classifier> {
    let ancestors_json: String = row.get("ancestors")?;
    let ancestors = serde_json::from_str(&ancestors_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Classifier {
        id: row.get("id")?,
        name: row.get("name")?,
        level: row.get("level")?,
        parent_id: row.get("parent_id")?,
        ancestors,
    })
}

fn insert_ticket_into(conn: &Connection, ticket: &Ticket) -> Result<()> {
    let history_json = serde_json::to_string(&ticket.history)?;
    conn.execute(
        r#"
        INSERT INTO tickets (
            id, title, description, current_state, classification,
            created_at, created_by, assigned_to,
            reopen_count, state_change_count, comment_count,
            closed_at, last_state_change_at, last_modified_at,
            history
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
        params![
            ticket.id,
            ticket.title,
            ticket.description,
            ticket.current_state.as_str(),
            ticket.classifier(),
            ticket.created_at.to_rfc3339(),
            ticket.created_by,
            ticket.assigned_to,
            ticket.reopen_count,
            ticket.state_change_count,
            ticket.comment_count,
            ticket.closed_at.map(|t| t.to_rfc3339()),
            ticket.last_state_change_at.map(|t| t.to_rfc3339()),
            ticket.last_modified_at.map(|t| t.to_rfc3339()),
            history_json,
        ],
    )?;
    Ok(())
}

fn insert_classifier_into(conn: &Connection, classifier: &Classifier) -> Result<()> {
    let ancestors_json = serde_json::to_string(&classifier.ancestors)?;
    conn.execute(
        "INSERT INTO classifiers (id, name, level, parent_id, ancestors)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            classifier.id,
            classifier.name,
            classifier.level,
            classifier.parent_id,
            ancestors_json,
        ],
    )?;
    Ok(())
}

fn range_params(range: &DateRange) -> Vec<Value> {
    vec![
        Value::from(range.start.to_rfc3339()),
        Value::from(range.end.to_rfc3339()),
    ]
}

fn push_state_filter(sql: &mut String, params: &mut Vec<Value>, state: StateFilter) {
    if let StateFilter::Only(state) = state {
        sql.push_str(" AND current_state = ?");
        params.push(Value::from(state.as_str().to_string()));
    }
}

fn push_classifier_scope(
    sql: &mut String,
    params: &mut Vec<Value>,
    column: &str,
    scope: &ClassifierScope,
) {
    match scope {
        ClassifierScope::All => {}
        // An empty id set matches nothing; it is not the All sentinel.
        ClassifierScope::Ids(ids) if ids.is_empty() => sql.push_str(" AND 1 = 0"),
        ClassifierScope::Ids(ids) => {
            sql.push_str(&format!(
                " AND {} IN ({})",
                column,
                vec!["?"; ids.len()].join(", ")
            ));
            params.extend(ids.iter().map(|id| Value::from(id.clone())));
        }
    }
}
