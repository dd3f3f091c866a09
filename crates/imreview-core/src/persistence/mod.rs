//! Persistence layer for imreview state
//!
//! Provides SQLite-backed storage for office snapshots: users, journals,
//! manuscripts and everything attached to them, plus the audit log.

mod repository;
mod schema;

pub use repository::Repository;
pub use schema::{Schema, SCHEMA_VERSION};
