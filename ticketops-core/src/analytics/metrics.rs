//! Metrics aggregator
//!
//! Computes the dashboard's period- and filter-scoped statistics. Every
//! function takes the explicit filter value, resolves the classifier
//! selection through the hierarchy, and issues one aggregation against the
//! store: one call per rendered widget.
//!
//! Window semantics differ by operation and are preserved exactly:
//! creation-scoped metrics constrain `created_at`; period event counts
//! constrain the event's own timestamp; the active-ticket listing is an
//! overlap test; and the resolution-time stats mix creation scoping with a
//! closure requirement (a quirk of the original dashboard, kept as-is).

use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::filters::{
    ClassifierScope, ClassifierSelection, DashboardFilter, DateRange, StateFilter,
};
use crate::db::{Database, TransitionKind};
use crate::error::Result;
use crate::taxonomy;
use crate::types::{ActionEntry, Ticket, TicketState};

/// Headline counts for the metric tiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketMetrics {
    /// Tickets created in the window under the active filters
    pub total: i64,
    pub open: i64,
    pub in_progress: i64,
    pub closed: i64,
    /// Sum of reopen counters over the matched tickets
    pub reopenings: i64,
}

impl TicketMetrics {
    /// Share of the total, for the tile captions.
    pub fn share(&self, count: i64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

/// One day of the creation trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub day: NaiveDate,
    pub count: i64,
}

/// Resolution time summary in floating-point days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolutionStats {
    pub mean_days: f64,
    pub min_days: f64,
    pub max_days: f64,
}

/// Split of tickets with vs without reopenings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReopeningStats {
    pub with_reopenings: i64,
    pub without_reopenings: i64,
    pub total: i64,
}

fn resolve(db: &Database, selection: &ClassifierSelection) -> Result<ClassifierScope> {
    taxonomy::resolve_scope(db, selection)
}

/// Headline metrics: total, per-state counts and reopening sum, all scoped
/// to `created_at` inside the window.
///
/// Under a specific state filter the per-state breakdown collapses to
/// total-or-zero; the filter is already exact, so no re-query happens.
pub fn ticket_metrics(db: &Database, filter: &DashboardFilter) -> Result<TicketMetrics> {
    let scope = resolve(db, &filter.classifier)?;
    let total = db.count_created_in_range(&filter.range, filter.state, &scope)?;

    let (open, in_progress, closed) = match filter.state {
        StateFilter::Only(state) => {
            let collapse = |s: TicketState| if state == s { total } else { 0 };
            (
                collapse(TicketState::Open),
                collapse(TicketState::InProgress),
                collapse(TicketState::Closed),
            )
        }
        StateFilter::All => (
            db.count_created_in_range(
                &filter.range,
                StateFilter::Only(TicketState::Open),
                &scope,
            )?,
            db.count_created_in_range(
                &filter.range,
                StateFilter::Only(TicketState::InProgress),
                &scope,
            )?,
            db.count_created_in_range(
                &filter.range,
                StateFilter::Only(TicketState::Closed),
                &scope,
            )?,
        ),
    };

    let reopenings = db.sum_reopenings_in_range(&filter.range, filter.state, &scope)?;

    Ok(TicketMetrics {
        total,
        open,
        in_progress,
        closed,
        reopenings,
    })
}

/// Per-classifier ticket counts, top `limit` descending.
pub fn tickets_by_classifier(
    db: &Database,
    filter: &DashboardFilter,
    limit: usize,
) -> Result<Vec<(String, i64)>> {
    let scope = resolve(db, &filter.classifier)?;
    db.classifier_counts(&filter.range, filter.state, &scope, limit)
}

/// Daily creation counts, ascending by day.
pub fn creation_trend(db: &Database, filter: &DashboardFilter) -> Result<Vec<TrendPoint>> {
    let scope = resolve(db, &filter.classifier)?;
    db.creation_trend(&filter.range, filter.state, &scope)
}

/// Resolution time stats over tickets with a closure recorded and
/// `created_at` inside the window. `None` when nothing matches.
pub fn resolution_time(db: &Database, filter: &DashboardFilter) -> Result<Option<ResolutionStats>> {
    let scope = resolve(db, &filter.classifier)?;
    db.resolution_stats(&filter.range, filter.state, &scope)
}

/// Reopening-rate split, scoped by state and classifier but never by date.
pub fn reopening_stats(
    db: &Database,
    state: StateFilter,
    classifier: &ClassifierSelection,
) -> Result<ReopeningStats> {
    let scope = resolve(db, classifier)?;
    db.reopening_split(state, &scope)
}

/// Closing transitions whose own timestamp falls inside the window. Counts
/// events, not tickets.
pub fn closures_in_period(
    db: &Database,
    range: &DateRange,
    classifier: &ClassifierSelection,
) -> Result<i64> {
    let scope = resolve(db, classifier)?;
    db.count_transitions(Some(range), &scope, TransitionKind::Closure)
}

/// Reopening transitions whose own timestamp falls inside the window.
/// Counts events, not tickets.
pub fn reopenings_in_period(
    db: &Database,
    range: &DateRange,
    classifier: &ClassifierSelection,
) -> Result<i64> {
    let scope = resolve(db, classifier)?;
    db.count_transitions(Some(range), &scope, TransitionKind::Reopening)
}

/// Tickets created in the window under an optional state filter. The intake
/// tile carries no classifier constraint.
pub fn intake_count(db: &Database, range: &DateRange, state: StateFilter) -> Result<i64> {
    db.count_created_in_range(range, state, &ClassifierScope::All)
}

/// Tickets active at any point overlapping the window, newest first.
pub fn active_tickets(
    db: &Database,
    filter: &DashboardFilter,
    limit: usize,
) -> Result<Vec<Ticket>> {
    let scope = resolve(db, &filter.classifier)?;
    db.active_tickets(&filter.range, filter.state, &scope, limit)
}

/// Individual history actions inside the window, newest first.
pub fn recent_actions(
    db: &Database,
    range: &DateRange,
    classifier: &ClassifierSelection,
    limit: usize,
) -> Result<Vec<ActionEntry>> {
    let scope = resolve(db, classifier)?;
    db.recent_actions(range, &scope, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_handles_empty_total() {
        let metrics = TicketMetrics::default();
        assert_eq!(metrics.share(0), 0.0);

        let metrics = TicketMetrics {
            total: 4,
            open: 1,
            ..Default::default()
        };
        assert!((metrics.share(metrics.open) - 25.0).abs() < f64::EPSILON);
    }
}
