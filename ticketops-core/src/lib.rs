//! # ticketops-core
//!
//! Core library for ticketops - an operational toolkit around a ticketing
//! dataset.
//!
//! This library provides:
//! - Domain types for tickets, history events, and classifiers
//! - A pure history analyzer projecting derived fields from event histories
//! - A SQLite-backed document store with server-side aggregation queries
//! - The classifier hierarchy resolver behind hierarchical filtering
//! - Seeding, derived-field refresh, and cross-deployment migration
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! The store holds two collections: `tickets`, each carrying an append-only
//! event history, and `classifiers`, static hierarchy reference data. The
//! derived counters on each ticket are projections of its history and are
//! refreshed, never authored. The analytics layer answers the dashboard's
//! aggregation queries against the store, one query per widget.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ticketops_core::{Config, Database};
//!
//! let config = Config::load().expect("failed to load config");
//! let db = Database::open(&config.database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod logging;
pub mod migrate;
pub mod refresh;
pub mod seed;
pub mod taxonomy;
pub mod types;
