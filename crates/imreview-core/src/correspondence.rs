//! Correspondence log
//!
//! Append-only record of messages exchanged about a manuscript. The only
//! mutable part of a record is its read flag, which moves one way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewError, Validator};
use crate::id::{ManuscriptId, RecordId, UserId};
use crate::role::Role;

pub use crate::mailer::DeliveryStatus;

/// A message to log, and optionally to deliver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCorrespondence {
    /// Address to deliver to; defaults to the primary author when delivering
    #[serde(default)]
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
    /// Ask the mailer to deliver the message
    #[serde(default)]
    pub deliver: bool,
}

impl NewCorrespondence {
    pub fn validate(&self) -> Result<()> {
        Validator::new()
            .require_text(&self.subject, "subject")
            .require_text(&self.body, "body")
            .finish()
    }
}

/// One logged message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceRecord {
    pub id: RecordId,
    pub manuscript_id: ManuscriptId,
    pub sender_id: UserId,
    pub sender_role: Role,
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub delivery: DeliveryStatus,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// Correspondence for one manuscript, in send order
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceLog {
    records: Vec<CorrespondenceRecord>,
}

impl CorrespondenceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted records
    pub fn from_records(records: Vec<CorrespondenceRecord>) -> Self {
        Self { records }
    }

    pub fn all(&self) -> &[CorrespondenceRecord] {
        &self.records
    }

    pub fn get(&self, id: &RecordId) -> Option<&CorrespondenceRecord> {
        self.records.iter().find(|r| r.id == *id)
    }

    pub fn unread_count(&self) -> usize {
        self.records.iter().filter(|r| !r.read).count()
    }

    /// Append a record; delivery has already been attempted by the caller
    pub fn append(
        &mut self,
        manuscript_id: ManuscriptId,
        sender_id: UserId,
        sender_role: Role,
        message: NewCorrespondence,
        delivery: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<&CorrespondenceRecord> {
        message.validate()?;
        let index = self.records.len();
        self.records.push(CorrespondenceRecord {
            id: RecordId::new(),
            manuscript_id,
            sender_id,
            sender_role,
            recipient: message.recipient,
            subject: message.subject.trim().to_string(),
            body: message.body,
            sent_at: now,
            delivery,
            read: false,
            read_at: None,
        });
        Ok(&self.records[index])
    }

    /// Mark a record read; returns whether anything changed
    pub fn mark_read(&mut self, id: &RecordId, now: DateTime<Utc>) -> Result<bool> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or_else(|| ReviewError::NotFound(format!("Correspondence {}", id)))?;
        if record.read {
            return Ok(false);
        }
        record.read = true;
        record.read_at = Some(now);
        Ok(true)
    }
}
