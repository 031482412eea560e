//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - user(id, username, hashed_password, email)
//! - topic(id, user_id, name, description)
//! - review(id, user_id, topic_id, review_text, status, review_ratings)
//! - session(id, user_id, created_at, expires_at, last_activity_at, is_active)

pub mod columns;
pub mod schema;
pub mod sqlite;

pub use columns::{ColumnMap, Value};
pub use sqlite::{DbStats, SqliteStore, StoreFault, StoreResult};
