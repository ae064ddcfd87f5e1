//! Derived-field refresh
//!
//! Re-projects every ticket's derived fields from its stored history and
//! writes them back with a single field-level update per ticket. The
//! projection is pure and the update writes every derived column (clearing
//! absent ones), so the pass is idempotent: running it twice produces the
//! same stored fields.
//!
//! Failures are isolated per ticket: a malformed document or a failed update
//! is counted, logged with the ticket id, and processing continues.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{DerivedFields, Event, TicketState};
use chrono::{DateTime, Utc};

/// Outcome of a refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Tickets examined
    pub processed: usize,
    /// Tickets whose derived fields were written
    pub updated: usize,
    /// Tickets that failed in isolation
    pub failed: usize,
}

/// Refresh the derived fields of every ticket in the collection.
///
/// `on_item` is called after each ticket with (index, total), for progress
/// reporting.
pub fn refresh_derived_fields<F>(db: &Database, mut on_item: F) -> Result<RefreshSummary>
where
    F: FnMut(usize, usize),
{
    let rows = db.list_raw_histories()?;
    let total = rows.len();
    let mut summary = RefreshSummary::default();

    tracing::info!(total, "Refreshing derived fields");

    for (index, row) in rows.into_iter().enumerate() {
        summary.processed += 1;

        match refresh_one(db, &row.id, &row.current_state, &row.created_at, &row.history_json) {
            Ok(()) => summary.updated += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(ticket_id = %row.id, error = %e, "Failed to refresh ticket");
            }
        }

        on_item(index + 1, total);
    }

    tracing::info!(
        processed = summary.processed,
        updated = summary.updated,
        failed = summary.failed,
        "Refresh complete"
    );

    Ok(summary)
}

fn refresh_one(
    db: &Database,
    id: &str,
    current_state: &str,
    created_at: &str,
    history_json: &str,
) -> Result<()> {
    let state: TicketState = current_state.parse().map_err(|e: String| Error::Document {
        collection: "tickets".into(),
        id: id.to_string(),
        message: e,
    })?;

    let history: Vec<Event> =
        serde_json::from_str(history_json).map_err(|e| Error::Document {
            collection: "tickets".into(),
            id: id.to_string(),
            message: e.to_string(),
        })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Document {
            collection: "tickets".into(),
            id: id.to_string(),
            message: format!("bad created_at: {}", e),
        })?;

    let derived = DerivedFields::project(&history, state, created_at);
    db.update_derived_fields(id, &derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classifications, CreatedDetails, Ticket};

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn ticket_without_derived(id: &str) -> Ticket {
        let created_at = ts("2025-09-01T10:00:00Z");
        let history = vec![
            Event::Created {
                timestamp: created_at,
                user_id: "user_001".into(),
                details: CreatedDetails {
                    initial_state: TicketState::Open,
                    initial_classification: "zonas_comunes".into(),
                },
            },
            Event::StateChange {
                timestamp: ts("2025-09-03T10:00:00Z"),
                user_id: "agent_001".into(),
                from: TicketState::Open,
                to: TicketState::Closed,
                comment: None,
            },
        ];
        Ticket {
            id: id.into(),
            title: "Broken gate".into(),
            description: "Main gate does not close".into(),
            current_state: TicketState::Closed,
            current_classifications: Classifications {
                request_type: "zonas_comunes".into(),
            },
            created_at,
            created_by: "user_001".into(),
            assigned_to: None,
            history,
            // Derived fields deliberately stale
            reopen_count: 0,
            state_change_count: 0,
            comment_count: 0,
            closed_at: None,
            last_state_change_at: None,
            last_modified_at: None,
        }
    }

    #[test]
    fn test_refresh_projects_and_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_ticket(&ticket_without_derived("ticket_0001")).unwrap();

        let first = refresh_derived_fields(&db, |_, _| {}).unwrap();
        assert_eq!(first.processed, 1);
        assert_eq!(first.updated, 1);
        assert_eq!(first.failed, 0);

        let after_first = db.get_ticket("ticket_0001").unwrap().unwrap();
        assert_eq!(after_first.state_change_count, 1);
        assert_eq!(after_first.closed_at, Some(ts("2025-09-03T10:00:00Z")));
        assert_eq!(after_first.last_modified_at, Some(ts("2025-09-03T10:00:00Z")));

        // Second run writes identical fields.
        let second = refresh_derived_fields(&db, |_, _| {}).unwrap();
        assert_eq!(second.failed, 0);
        let after_second = db.get_ticket("ticket_0001").unwrap().unwrap();
        assert_eq!(after_second.closed_at, after_first.closed_at);
        assert_eq!(after_second.reopen_count, after_first.reopen_count);
    }

    #[test]
    fn test_malformed_history_is_isolated() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_ticket(&ticket_without_derived("ticket_0001")).unwrap();

        // Corrupt one document's history behind the typed API.
        db.connection()
            .execute(
                "INSERT INTO tickets (id, title, description, current_state, classification,
                                      created_at, created_by, history)
                 VALUES ('ticket_0002', 'Bad', 'Bad', 'open', 'zonas_comunes',
                         '2025-09-01T10:00:00+00:00', 'user_001', 'not json')",
                [],
            )
            .unwrap();

        let summary = refresh_derived_fields(&db, |_, _| {}).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 1);
    }
}
