//! Repository for saving and loading imreview state

use std::path::Path;

use crate::error::{PersistenceError, Result};
use crate::office::OfficeSnapshot;

#[cfg(feature = "sqlite")]
use super::schema::{Schema, SCHEMA_VERSION};
#[cfg(feature = "sqlite")]
use crate::error::ReviewError;
#[cfg(feature = "sqlite")]
use crate::manuscript::Manuscript;
#[cfg(feature = "sqlite")]
use rusqlite::{Connection, OptionalExtension};

/// Repository for persisting imreview state
#[cfg(feature = "sqlite")]
pub struct Repository {
    conn: Connection,
}

#[cfg(feature = "sqlite")]
impl Repository {
    /// Create a new repository with the given database path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Create an in-memory repository (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Initialize the database schema
    fn initialize(&self) -> Result<()> {
        let current_version = self.get_schema_version().unwrap_or(0);

        if current_version == 0 {
            self.conn.execute_batch(Schema::create_tables())?;
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    self.conn.execute_batch(migration)?;
                }
            }
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version > SCHEMA_VERSION {
            return Err(PersistenceError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                actual: current_version,
            }
            .into());
        }

        Ok(())
    }

    fn get_schema_version(&self) -> Option<u32> {
        self.conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY applied_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok()
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
        Ok(())
    }

    // ==================== Snapshot Operations ====================

    /// Save a whole office snapshot in one transaction
    ///
    /// Existing rows are replaced and events are appended. Fails with
    /// [`ReviewError::Conflict`] if any stored manuscript is newer than the
    /// one being saved; nothing is written in that case. Every change to a
    /// manuscript's invitations, assignments, decisions or correspondence
    /// bumps its row version, so the check covers those rows too.
    pub fn save_snapshot(&self, snapshot: &OfficeSnapshot) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for user in &snapshot.users {
            tx.execute(
                "INSERT OR REPLACE INTO users (id, email, created_at, doc) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    user.id.to_string(),
                    user.email,
                    user.created_at.to_rfc3339(),
                    serde_json::to_string(user)?,
                ],
            )?;
        }
        for journal in &snapshot.journals {
            tx.execute(
                "INSERT OR REPLACE INTO journals (id, name, created_at, doc) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    journal.id.to_string(),
                    journal.name,
                    journal.created_at.to_rfc3339(),
                    serde_json::to_string(journal)?,
                ],
            )?;
        }
        for manuscript in &snapshot.manuscripts {
            Self::put_manuscript(&tx, manuscript)?;
        }
        for invitation in &snapshot.invitations {
            tx.execute(
                "INSERT OR REPLACE INTO invitations (token, manuscript_id, status, issued_at, doc) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    invitation.token.as_str(),
                    invitation.manuscript_id.to_string(),
                    invitation.status.to_string(),
                    invitation.issued_at.to_rfc3339(),
                    serde_json::to_string(invitation)?,
                ],
            )?;
        }
        for assignment in &snapshot.assignments {
            tx.execute(
                "INSERT OR REPLACE INTO assignments (id, manuscript_id, reviewer_id, status, created_at, doc) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    assignment.id.to_string(),
                    assignment.manuscript_id.to_string(),
                    assignment.reviewer_id.to_string(),
                    assignment.status.to_string(),
                    assignment.created_at.to_rfc3339(),
                    serde_json::to_string(assignment)?,
                ],
            )?;
        }
        for decision in &snapshot.decisions {
            tx.execute(
                "INSERT OR REPLACE INTO decisions (id, manuscript_id, manuscript_version, decided_at, doc) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    decision.id.to_string(),
                    decision.manuscript_id.to_string(),
                    decision.manuscript_version,
                    decision.decided_at.to_rfc3339(),
                    serde_json::to_string(decision)?,
                ],
            )?;
        }
        for record in &snapshot.correspondence {
            tx.execute(
                "INSERT OR REPLACE INTO correspondence (id, manuscript_id, sent_at, doc) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    record.id.to_string(),
                    record.manuscript_id.to_string(),
                    record.sent_at.to_rfc3339(),
                    serde_json::to_string(record)?,
                ],
            )?;
        }
        for event in &snapshot.events {
            tx.execute(
                "INSERT OR IGNORE INTO events (id, sequence, timestamp, entity_id, entity_type, actor_id, correlation_id, doc) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    event.id.to_string(),
                    event.sequence,
                    event.timestamp.to_rfc3339(),
                    event.entity_id,
                    event.entity_type.to_string(),
                    event.actor_id,
                    event.correlation_id,
                    serde_json::to_string(event)?,
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!(
            manuscripts = snapshot.manuscripts.len(),
            events = snapshot.events.len(),
            "Snapshot saved"
        );
        Ok(())
    }

    /// Load everything stored into a snapshot
    ///
    /// Rows come back in the order saves wrote them; an updated manuscript
    /// keeps its original place.
    pub fn load_snapshot(&self) -> Result<OfficeSnapshot> {
        Ok(OfficeSnapshot {
            users: self.load_docs("SELECT doc FROM users ORDER BY rowid")?,
            journals: self.load_docs("SELECT doc FROM journals ORDER BY rowid")?,
            manuscripts: self.load_docs("SELECT doc FROM manuscripts ORDER BY rowid")?,
            invitations: self.load_docs("SELECT doc FROM invitations ORDER BY rowid")?,
            assignments: self.load_docs("SELECT doc FROM assignments ORDER BY rowid")?,
            decisions: self.load_docs("SELECT doc FROM decisions ORDER BY rowid")?,
            correspondence: self.load_docs("SELECT doc FROM correspondence ORDER BY rowid")?,
            events: self.load_docs("SELECT doc FROM events ORDER BY sequence")?,
        })
    }

    fn load_docs<T: serde::de::DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let docs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        docs.iter()
            .map(|doc| serde_json::from_str(doc).map_err(ReviewError::from))
            .collect()
    }

    // ==================== Manuscript Operations ====================

    /// Save one manuscript, refusing to overwrite a newer stored version
    pub fn save_manuscript(&self, manuscript: &Manuscript) -> Result<()> {
        Self::put_manuscript(&self.conn, manuscript)
    }

    /// Get a manuscript by ID
    pub fn get_manuscript(&self, id: &str) -> Result<Option<Manuscript>> {
        let doc: Option<String> = self
            .conn
            .query_row("SELECT doc FROM manuscripts WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        doc.map(|doc| serde_json::from_str(&doc).map_err(ReviewError::from))
            .transpose()
    }

    /// Stored row version of a manuscript
    pub fn manuscript_row_version(&self, id: &str) -> Result<Option<u64>> {
        Self::stored_row_version(&self.conn, id)
    }

    fn stored_row_version(conn: &Connection, id: &str) -> Result<Option<u64>> {
        Ok(conn
            .query_row(
                "SELECT row_version FROM manuscripts WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn put_manuscript(conn: &Connection, manuscript: &Manuscript) -> Result<()> {
        let id = manuscript.id.to_string();
        if let Some(stored) = Self::stored_row_version(conn, &id)? {
            if stored > manuscript.row_version {
                return Err(ReviewError::Conflict {
                    entity: "Manuscript".to_string(),
                    id,
                    expected: manuscript.row_version,
                    actual: stored,
                });
            }
        }
        conn.execute(
            r#"
            INSERT INTO manuscripts
            (id, journal_id, status, row_version, submitted_at, doc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                row_version = excluded.row_version,
                doc = excluded.doc
            "#,
            rusqlite::params![
                id,
                manuscript.journal_id.to_string(),
                manuscript.status.as_str(),
                manuscript.row_version,
                manuscript.submitted_at.to_rfc3339(),
                serde_json::to_string(manuscript)?,
            ],
        )?;
        Ok(())
    }
}

// Stub implementation when sqlite feature is not enabled
#[cfg(not(feature = "sqlite"))]
pub struct Repository;

#[cfg(not(feature = "sqlite"))]
impl Repository {
    pub fn new(_path: impl AsRef<Path>) -> Result<Self> {
        Err(Self::disabled())
    }

    pub fn in_memory() -> Result<Self> {
        Err(Self::disabled())
    }

    pub fn save_snapshot(&self, _snapshot: &OfficeSnapshot) -> Result<()> {
        Err(Self::disabled())
    }

    pub fn load_snapshot(&self) -> Result<OfficeSnapshot> {
        Err(Self::disabled())
    }

    fn disabled() -> crate::error::ReviewError {
        PersistenceError::Database(
            "SQLite support not enabled. Enable the 'sqlite' feature.".to_string(),
        )
        .into()
    }
}
