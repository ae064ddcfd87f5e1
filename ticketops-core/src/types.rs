//! Core domain types for ticketops
//!
//! These types give the loosely-typed ticket documents of the source dataset
//! an explicit schema. A ticket carries an append-only event history; every
//! counter and timestamp outside that history is derived from it by the
//! [`crate::history`] projection, never authored independently.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Ticket** | A unit of reported work with lifecycle state and an event history |
//! | **Event** | An immutable record of one action applied to a ticket |
//! | **Classifier** | A node in the hierarchical taxonomy used to categorize tickets |
//! | **Reopening** | A `state_change` from `closed` to any non-closed state |
//! | **Derived field** | A value computed from `history`, not stored as primary input |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single classification dimension used by this dataset.
pub const REQUEST_TYPE_DIMENSION: &str = "tipo_solicitud";

// ============================================
// Ticket lifecycle state
// ============================================

/// Lifecycle state of a ticket.
///
/// Reflects the `to` value of the most recent `state_change` event in the
/// ticket's history, or `Open` if no such event exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    Open,
    InProgress,
    Closed,
    Pending,
    Cancelled,
}

impl TicketState {
    /// All states, in the order the dashboard presents them.
    pub const ALL: [TicketState; 5] = [
        TicketState::Open,
        TicketState::InProgress,
        TicketState::Closed,
        TicketState::Pending,
        TicketState::Cancelled,
    ];

    /// Returns the identifier used in database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Open => "open",
            TicketState::InProgress => "in_progress",
            TicketState::Closed => "closed",
            TicketState::Pending => "pending",
            TicketState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TicketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TicketState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketState::Open),
            "in_progress" => Ok(TicketState::InProgress),
            "closed" => Ok(TicketState::Closed),
            "pending" => Ok(TicketState::Pending),
            "cancelled" => Ok(TicketState::Cancelled),
            _ => Err(format!("unknown ticket state: {}", s)),
        }
    }
}

// ============================================
// Events
// ============================================

/// Payload of a `created` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDetails {
    /// State the ticket was opened in
    pub initial_state: TicketState,
    /// Leaf classifier assigned at creation
    pub initial_classification: String,
}

/// One entry in a ticket's history.
///
/// Tagged by `action` on the wire, matching the stored document shape.
/// History is append-only and insertion order is chronological order; no
/// consumer may re-sort it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Event {
    /// Ticket creation. Exactly one per ticket, first in history.
    #[serde(rename_all = "camelCase")]
    Created {
        timestamp: DateTime<Utc>,
        user_id: String,
        details: CreatedDetails,
    },
    /// Assignment of the ticket to a user. `user_id` is the actor.
    #[serde(rename_all = "camelCase")]
    Assignment {
        timestamp: DateTime<Utc>,
        user_id: String,
        assigned_to: String,
    },
    /// Transition between lifecycle states.
    #[serde(rename_all = "camelCase")]
    StateChange {
        timestamp: DateTime<Utc>,
        user_id: String,
        from: TicketState,
        to: TicketState,
        #[serde(skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    /// Free-text comment.
    #[serde(rename_all = "camelCase")]
    Comment {
        timestamp: DateTime<Utc>,
        user_id: String,
        comment: String,
    },
}

impl Event {
    /// Timestamp of this event, independent of its kind.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::Created { timestamp, .. }
            | Event::Assignment { timestamp, .. }
            | Event::StateChange { timestamp, .. }
            | Event::Comment { timestamp, .. } => *timestamp,
        }
    }

    /// User who performed this action.
    pub fn user_id(&self) -> &str {
        match self {
            Event::Created { user_id, .. }
            | Event::Assignment { user_id, .. }
            | Event::StateChange { user_id, .. }
            | Event::Comment { user_id, .. } => user_id,
        }
    }

    /// The `action` discriminant as stored on the wire.
    pub fn action(&self) -> &'static str {
        match self {
            Event::Created { .. } => "created",
            Event::Assignment { .. } => "assignment",
            Event::StateChange { .. } => "state_change",
            Event::Comment { .. } => "comment",
        }
    }
}

// ============================================
// Tickets
// ============================================

/// Classification assignment of a ticket.
///
/// The dataset uses exactly one dimension, `tipo_solicitud`, mapping to a
/// leaf classifier id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classifications {
    #[serde(rename = "tipo_solicitud")]
    pub request_type: String,
}

/// Counters and timestamps derived from a ticket's history.
///
/// Recomputed by the projection in [`crate::history`]; never authored
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedFields {
    /// Count of `state_change` events with `from == closed` and `to != closed`
    pub reopen_count: u32,
    /// Count of all `state_change` events
    pub state_change_count: u32,
    /// Count of `comment` events
    pub comment_count: u32,
    /// Timestamp of the closing transition; present iff current state is closed
    /// and a closing event exists in history
    pub closed_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent `state_change`; present iff any exists
    pub last_state_change_at: Option<DateTime<Utc>>,
    /// Timestamp of the last history event, or `created_at` if history is empty
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// A ticket document: primary fields plus the embedded event history and the
/// derived fields projected from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique identifier, assigned at creation, immutable
    pub id: String,
    pub title: String,
    pub description: String,
    /// Mirrors the last `state_change` in history (or open if none)
    pub current_state: TicketState,
    pub current_classifications: Classifications,
    /// Set once at creation, never mutated
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    /// Current assignee, if any
    pub assigned_to: Option<String>,
    /// Append-only event history; insertion order is chronological order
    pub history: Vec<Event>,

    // Derived fields (see DerivedFields)
    pub reopen_count: u32,
    pub state_change_count: u32,
    pub comment_count: u32,
    pub closed_at: Option<DateTime<Utc>>,
    pub last_state_change_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Leaf classifier id this ticket is filed under.
    pub fn classifier(&self) -> &str {
        &self.current_classifications.request_type
    }

    /// Copy the given derived fields onto this ticket.
    pub fn apply_derived(&mut self, derived: &DerivedFields) {
        self.reopen_count = derived.reopen_count;
        self.state_change_count = derived.state_change_count;
        self.comment_count = derived.comment_count;
        self.closed_at = derived.closed_at;
        self.last_state_change_at = derived.last_state_change_at;
        self.last_modified_at = derived.last_modified_at;
    }
}

// ============================================
// Classifiers
// ============================================

/// A node in the classification taxonomy.
///
/// `ancestors` lists ancestor ids root-to-parent. Tickets reference leaf
/// classifiers only, but filters may target any level. Reference data is
/// static and read-only from this crate's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classifier {
    pub id: String,
    pub name: String,
    /// Depth in the hierarchy; roots are level 0
    pub level: i64,
    pub parent_id: Option<String>,
    pub ancestors: Vec<String>,
}

// ============================================
// Unwound history rows
// ============================================

/// One history event projected out of its ticket, for the recent-actions
/// listing.
#[derive(Debug, Clone, Serialize)]
pub struct ActionEntry {
    pub ticket_id: String,
    pub title: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    /// Source state, for state_change events
    pub from: Option<TicketState>,
    /// Target state, for state_change events
    pub to: Option<TicketState>,
}
