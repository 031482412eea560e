//! # Reviewhub - persistence and session engine
//!
//! Users post topics and write structured reviews against them. This crate
//! provides the core underneath the web layer:
//! - SQLite-backed record store driven by declarative table definitions
//! - Entity mapper turning typed records into column maps and back
//! - Session engine with one logical active session per user
//! - Salted PBKDF2 credential hashing

pub mod auth;
pub mod config;
pub mod mapper;
pub mod model;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use auth::{Accounts, CredentialService, PasswordHash, SessionManager};
pub use mapper::{EntityMapper, Persistable};
pub use model::{Review, ReviewStatus, Session, Topic, User};
pub use storage::{ColumnMap, SqliteStore, StoreFault};

/// Result type alias for Reviewhub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Reviewhub operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Store fault: {0}")]
    Store(#[from] StoreFault),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid record kind: {0}")]
    UnknownRecordKind(String),

    #[error("Error adding {kind} with id {id}: {fault}")]
    SaveRejected {
        kind: &'static str,
        id: String,
        fault: StoreFault,
    },

    #[error("{kind} with id {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Schema mismatch for {kind}: {fault}")]
    SchemaMismatch { kind: &'static str, fault: StoreFault },

    #[error("Cannot decode column {column}: {reason}")]
    Decode { column: String, reason: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl Error {
    /// True when a save was refused by a UNIQUE, FOREIGN KEY or CHECK constraint
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::SaveRejected { fault, .. } if fault.is_constraint_violation())
    }
}
