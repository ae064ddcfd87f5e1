//! Analytics: filter configuration and the metrics aggregator.
//!
//! The dashboard passes a [`DashboardFilter`] value into each call; the
//! aggregator resolves the classifier selection through [`crate::taxonomy`]
//! and issues one server-side aggregation per widget.

pub mod filters;
pub mod metrics;

pub use filters::{
    ClassifierScope, ClassifierSelection, DashboardFilter, DateRange, StateFilter,
};
pub use metrics::{ReopeningStats, ResolutionStats, TicketMetrics, TrendPoint};
