//! Database layer: SQLite storage for the tickets and classifiers
//! collections.

pub mod repo;
pub mod schema;

pub use repo::{Database, DerivedFieldStats, IndexSpec, RawTicketHistory, TransitionKind};
pub use schema::{COLLECTIONS, SCHEMA_VERSION};
