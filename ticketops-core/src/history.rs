//! History analyzer
//!
//! Pure, stateless functions mapping a ticket's event history to its derived
//! fields. No I/O, no side effects. History is consumed as stored: insertion
//! order is chronological order and nothing here re-sorts it.
//!
//! All functions tolerate an empty history (returning 0 or absent), and the
//! closure scan tolerates inconsistent data (state is closed but no closing
//! event exists) by yielding absent rather than an error.

use chrono::{DateTime, Utc};

use crate::types::{DerivedFields, Event, TicketState};

/// Count reopenings: `state_change` events going from closed to a non-closed
/// state. Order-independent.
pub fn count_reopenings(history: &[Event]) -> u32 {
    history
        .iter()
        .filter(|e| {
            matches!(
                e,
                Event::StateChange { from, to, .. }
                    if *from == TicketState::Closed && *to != TicketState::Closed
            )
        })
        .count() as u32
}

/// Count all `state_change` events.
pub fn count_state_changes(history: &[Event]) -> u32 {
    history
        .iter()
        .filter(|e| matches!(e, Event::StateChange { .. }))
        .count() as u32
}

/// Count all `comment` events.
pub fn count_comments(history: &[Event]) -> u32 {
    history
        .iter()
        .filter(|e| matches!(e, Event::Comment { .. }))
        .count() as u32
}

/// Timestamp of the transition that put the ticket in its current closed
/// state.
///
/// Returns `None` when `current_state` is not closed. Otherwise scans from
/// the end of history and returns the timestamp of the most recent
/// `state_change` with `to == closed`. A closed ticket without any closing
/// event is inconsistent data; it yields `None`, never an error.
pub fn last_closure_timestamp(
    history: &[Event],
    current_state: TicketState,
) -> Option<DateTime<Utc>> {
    if current_state != TicketState::Closed {
        return None;
    }
    history.iter().rev().find_map(|e| match e {
        Event::StateChange { timestamp, to, .. } if *to == TicketState::Closed => Some(*timestamp),
        _ => None,
    })
}

/// Timestamp of the most recent `state_change`, scanning from the end.
pub fn last_state_change_timestamp(history: &[Event]) -> Option<DateTime<Utc>> {
    history.iter().rev().find_map(|e| match e {
        Event::StateChange { timestamp, .. } => Some(*timestamp),
        _ => None,
    })
}

/// Timestamp of the last history event, falling back to `created_at` for an
/// empty history.
pub fn last_modified_timestamp(history: &[Event], created_at: DateTime<Utc>) -> DateTime<Utc> {
    history.last().map_or(created_at, Event::timestamp)
}

/// The state implied by history: the `to` of the last `state_change`, or
/// open when no state change exists.
pub fn current_state_of(history: &[Event]) -> TicketState {
    history
        .iter()
        .rev()
        .find_map(|e| match e {
            Event::StateChange { to, .. } => Some(*to),
            _ => None,
        })
        .unwrap_or(TicketState::Open)
}

impl DerivedFields {
    /// Project a history into the full set of derived fields.
    ///
    /// Idempotent: projecting the same history twice yields identical
    /// fields, so a refresh run is always safe to repeat.
    pub fn project(
        history: &[Event],
        current_state: TicketState,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reopen_count: count_reopenings(history),
            state_change_count: count_state_changes(history),
            comment_count: count_comments(history),
            closed_at: last_closure_timestamp(history, current_state),
            last_state_change_at: last_state_change_timestamp(history),
            last_modified_at: Some(last_modified_timestamp(history, created_at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CreatedDetails;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn created(at: &str) -> Event {
        Event::Created {
            timestamp: ts(at),
            user_id: "user_001".into(),
            details: CreatedDetails {
                initial_state: TicketState::Open,
                initial_classification: "zonas_comunes".into(),
            },
        }
    }

    fn assignment(at: &str) -> Event {
        Event::Assignment {
            timestamp: ts(at),
            user_id: "supervisor_001".into(),
            assigned_to: "agent_001".into(),
        }
    }

    fn change(at: &str, from: TicketState, to: TicketState) -> Event {
        Event::StateChange {
            timestamp: ts(at),
            user_id: "agent_001".into(),
            from,
            to,
            comment: None,
        }
    }

    fn comment(at: &str) -> Event {
        Event::Comment {
            timestamp: ts(at),
            user_id: "agent_001".into(),
            comment: "done".into(),
        }
    }

    #[test]
    fn test_empty_history() {
        let created_at = ts("2025-09-01T00:00:00Z");
        assert_eq!(count_reopenings(&[]), 0);
        assert_eq!(count_state_changes(&[]), 0);
        assert_eq!(count_comments(&[]), 0);
        assert_eq!(last_closure_timestamp(&[], TicketState::Closed), None);
        assert_eq!(last_state_change_timestamp(&[]), None);
        assert_eq!(last_modified_timestamp(&[], created_at), created_at);
        assert_eq!(current_state_of(&[]), TicketState::Open);
    }

    #[test]
    fn test_reopen_then_open_scenario() {
        // created(open), assignment, open->in_progress, in_progress->closed,
        // closed->open
        let history = vec![
            created("2025-09-01T10:00:00Z"),
            assignment("2025-09-01T12:00:00Z"),
            change(
                "2025-09-01T12:05:00Z",
                TicketState::Open,
                TicketState::InProgress,
            ),
            change(
                "2025-09-05T09:00:00Z",
                TicketState::InProgress,
                TicketState::Closed,
            ),
            change(
                "2025-09-09T16:00:00Z",
                TicketState::Closed,
                TicketState::Open,
            ),
        ];

        assert_eq!(current_state_of(&history), TicketState::Open);
        assert_eq!(count_reopenings(&history), 1);
        assert_eq!(count_state_changes(&history), 3);
        // State is open, so the closure timestamp is absent even though a
        // closing event exists further back.
        assert_eq!(last_closure_timestamp(&history, TicketState::Open), None);
        assert_eq!(
            last_state_change_timestamp(&history),
            Some(ts("2025-09-09T16:00:00Z"))
        );
    }

    #[test]
    fn test_last_closure_picks_most_recent() {
        let history = vec![
            created("2025-09-01T10:00:00Z"),
            change(
                "2025-09-02T10:00:00Z",
                TicketState::Open,
                TicketState::Closed,
            ),
            change(
                "2025-09-03T10:00:00Z",
                TicketState::Closed,
                TicketState::Open,
            ),
            change(
                "2025-09-08T10:00:00Z",
                TicketState::Open,
                TicketState::Closed,
            ),
        ];
        assert_eq!(
            last_closure_timestamp(&history, TicketState::Closed),
            Some(ts("2025-09-08T10:00:00Z"))
        );
        assert_eq!(count_reopenings(&history), 1);
    }

    #[test]
    fn test_closed_state_without_closing_event_yields_absent() {
        // Inconsistent data: callers say closed but history never closes.
        let history = vec![
            created("2025-09-01T10:00:00Z"),
            change(
                "2025-09-02T10:00:00Z",
                TicketState::Open,
                TicketState::InProgress,
            ),
        ];
        assert_eq!(last_closure_timestamp(&history, TicketState::Closed), None);
    }

    #[test]
    fn test_last_modified_uses_final_event() {
        let history = vec![created("2025-09-01T10:00:00Z"), comment("2025-09-04T08:00:00Z")];
        assert_eq!(
            last_modified_timestamp(&history, ts("2025-09-01T10:00:00Z")),
            ts("2025-09-04T08:00:00Z")
        );
        assert_eq!(count_comments(&history), 1);
    }

    #[test]
    fn test_projection_idempotent() {
        let history = vec![
            created("2025-09-01T10:00:00Z"),
            change(
                "2025-09-02T10:00:00Z",
                TicketState::Open,
                TicketState::Closed,
            ),
        ];
        let created_at = ts("2025-09-01T10:00:00Z");
        let state = current_state_of(&history);
        let first = DerivedFields::project(&history, state, created_at);
        let second = DerivedFields::project(&history, state, created_at);
        assert_eq!(first, second);
        assert_eq!(first.closed_at, Some(ts("2025-09-02T10:00:00Z")));
        assert_eq!(first.last_modified_at, Some(ts("2025-09-02T10:00:00Z")));
    }
}
