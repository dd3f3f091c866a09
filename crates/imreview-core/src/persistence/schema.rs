//! SQLite schema for imreview state storage

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite schema definition
///
/// Entities are stored as JSON documents with a few indexed columns pulled
/// out for lookups. Rows are never deleted.
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Users with their role grants
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    doc TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS journals (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    doc TEXT NOT NULL
);

-- Manuscripts; row_version guards the manuscript and everything hanging off it.
-- Manuscripts can be saved on their own, so journal_id is not a foreign key.
CREATE TABLE IF NOT EXISTS manuscripts (
    id TEXT PRIMARY KEY,
    journal_id TEXT NOT NULL,
    status TEXT NOT NULL,
    row_version INTEGER NOT NULL,
    submitted_at TEXT NOT NULL,
    doc TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_manuscripts_journal ON manuscripts(journal_id);
CREATE INDEX IF NOT EXISTS idx_manuscripts_status ON manuscripts(status);

CREATE TABLE IF NOT EXISTS invitations (
    token TEXT PRIMARY KEY,
    manuscript_id TEXT NOT NULL,
    status TEXT NOT NULL,
    issued_at TEXT NOT NULL,
    doc TEXT NOT NULL,
    FOREIGN KEY (manuscript_id) REFERENCES manuscripts(id)
);

CREATE INDEX IF NOT EXISTS idx_invitations_manuscript ON invitations(manuscript_id);

CREATE TABLE IF NOT EXISTS assignments (
    id TEXT PRIMARY KEY,
    manuscript_id TEXT NOT NULL,
    reviewer_id TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    doc TEXT NOT NULL,
    FOREIGN KEY (manuscript_id) REFERENCES manuscripts(id)
);

CREATE INDEX IF NOT EXISTS idx_assignments_manuscript ON assignments(manuscript_id);
CREATE INDEX IF NOT EXISTS idx_assignments_reviewer ON assignments(reviewer_id);

CREATE TABLE IF NOT EXISTS decisions (
    id TEXT PRIMARY KEY,
    manuscript_id TEXT NOT NULL,
    manuscript_version INTEGER NOT NULL,
    decided_at TEXT NOT NULL,
    doc TEXT NOT NULL,
    FOREIGN KEY (manuscript_id) REFERENCES manuscripts(id)
);

CREATE INDEX IF NOT EXISTS idx_decisions_manuscript ON decisions(manuscript_id);

CREATE TABLE IF NOT EXISTS correspondence (
    id TEXT PRIMARY KEY,
    manuscript_id TEXT NOT NULL,
    sent_at TEXT NOT NULL,
    doc TEXT NOT NULL,
    FOREIGN KEY (manuscript_id) REFERENCES manuscripts(id)
);

CREATE INDEX IF NOT EXISTS idx_correspondence_manuscript ON correspondence(manuscript_id);

-- Events table (append-only audit log)
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    sequence INTEGER NOT NULL UNIQUE,
    timestamp TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    actor_id TEXT,
    correlation_id TEXT,
    doc TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_sequence ON events(sequence);
CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_id, entity_type);
CREATE INDEX IF NOT EXISTS idx_events_correlation ON events(correlation_id);
"#
    }

    /// Get migration SQL for a specific version
    pub fn migration(from_version: u32, to_version: u32) -> Option<&'static str> {
        match (from_version, to_version) {
            // (1, 2) => Some("ALTER TABLE ..."),
            _ => None,
        }
    }
}
