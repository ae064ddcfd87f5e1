//! Error types for ticketops-core

use thiserror::Error;

/// Main error type for the ticketops-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed document in a collection (bad history JSON, bad enum value)
    #[error("malformed document {id} in {collection}: {message}")]
    Document {
        collection: String,
        id: String,
        message: String,
    },

    /// Ticket not found
    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type alias for ticketops-core
pub type Result<T> = std::result::Result<T, Error>;
