//! Dashboard filter configuration
//!
//! Filters are explicit values passed into every aggregation call. There is
//! no session-global filter state; the presentation layer owns one
//! [`DashboardFilter`] and hands it down per query.

use chrono::{DateTime, Duration, Utc};

use crate::types::TicketState;

/// Inclusive date window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of the last `days` days ending at `end`.
    pub fn last_days(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(days as i64),
            end,
        }
    }
}

/// State selector: everything, or exactly one lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StateFilter {
    #[default]
    All,
    Only(TicketState),
}

impl StateFilter {
    /// Label shown by the dashboard selector.
    pub fn label(&self) -> &'static str {
        match self {
            StateFilter::All => "all",
            StateFilter::Only(state) => state.as_str(),
        }
    }
}

/// Classifier selector as chosen in the UI: the sentinel, or one node id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClassifierSelection {
    #[default]
    All,
    Node(String),
}

impl ClassifierSelection {
    pub fn label(&self) -> &str {
        match self {
            ClassifierSelection::All => "all",
            ClassifierSelection::Node(id) => id,
        }
    }
}

/// A classifier selection resolved against the hierarchy.
///
/// `All` means no constraint; it is distinct from `Ids(vec![])`, which
/// matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierScope {
    All,
    Ids(Vec<String>),
}

impl ClassifierScope {
    pub fn is_constrained(&self) -> bool {
        matches!(self, ClassifierScope::Ids(_))
    }
}

/// The full filter configuration the dashboard passes to the aggregator.
#[derive(Debug, Clone)]
pub struct DashboardFilter {
    pub range: DateRange,
    pub state: StateFilter,
    pub classifier: ClassifierSelection,
}

impl DashboardFilter {
    /// Default filter: last `window_days` days, all states, all classifiers.
    pub fn default_window(now: DateTime<Utc>, window_days: u32) -> Self {
        Self {
            range: DateRange::last_days(now, window_days),
            state: StateFilter::All,
            classifier: ClassifierSelection::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_days_window() {
        let end: DateTime<Utc> = "2025-10-01T00:00:00Z".parse().unwrap();
        let range = DateRange::last_days(end, 60);
        assert_eq!(range.end, end);
        assert_eq!(range.start, "2025-08-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_scope_all_is_not_empty_ids() {
        assert_ne!(ClassifierScope::All, ClassifierScope::Ids(vec![]));
        assert!(!ClassifierScope::All.is_constrained());
        assert!(ClassifierScope::Ids(vec![]).is_constrained());
    }
}
