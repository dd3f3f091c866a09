//! Manuscript struct and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ManuscriptEvent, ManuscriptStatus, RevisionSeverity};
use crate::config::RevisionConfig;
use crate::error::{Result, ReviewError, Validator};
use crate::id::{JournalId, ManuscriptId, UserId};

/// Opaque reference to a stored file; the engine never reads the content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(pub String);

impl FileRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A co-author listed on the manuscript, in byline order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoAuthor {
    pub name: String,
    pub email: Option<String>,
    pub affiliation: Option<String>,
}

/// One submitted version of the manuscript file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptVersion {
    pub number: u32,
    pub file: FileRef,
    pub submitted_at: DateTime<Utc>,
    /// The author's note on what changed
    pub note: Option<String>,
    /// Superseded by a later version
    pub archived: bool,
}

/// Volume, issue and DOI assigned at publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationDetails {
    pub volume: u32,
    pub issue: u32,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
    pub doi: String,
    pub published_at: DateTime<Utc>,
}

impl PublicationDetails {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.check(self.volume >= 1, "volume", "must be at least 1")
            .check(self.issue >= 1, "issue", "must be at least 1")
            .check(
                self.page_start.map_or(true, |p| p >= 1),
                "page_start",
                "must be at least 1",
            )
            .check(
                self.page_end.map_or(true, |p| p >= 1),
                "page_end",
                "must be at least 1",
            );
        if let (Some(start), Some(end)) = (self.page_start, self.page_end) {
            v.check(end >= start, "page_end", "must not be before page_start");
        }
        v.check(
            self.doi.starts_with("10.") && self.doi.contains('/'),
            "doi",
            "must have the form prefix/suffix",
        );
        v.finish()
    }
}

/// A recorded status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    /// `None` for the creating submission
    pub from: Option<ManuscriptStatus>,
    pub to: ManuscriptStatus,
    pub event: String,
    pub actor: UserId,
    pub at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Payload of a new submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewManuscript {
    pub journal_id: JournalId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub co_authors: Vec<CoAuthor>,
    pub file: FileRef,
    #[serde(default)]
    pub research_area: Option<String>,
}

impl NewManuscript {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.require_text(&self.title, "title")
            .require_text(&self.abstract_text, "abstract")
            .check(!self.file.is_blank(), "file", "must not be empty");
        for (i, co_author) in self.co_authors.iter().enumerate() {
            v.check(
                !co_author.name.trim().is_empty(),
                &format!("co_authors[{}].name", i),
                "must not be empty",
            );
        }
        v.finish()
    }
}

/// A manuscript and its full version history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: ManuscriptId,
    pub journal_id: JournalId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub primary_author: UserId,
    pub co_authors: Vec<CoAuthor>,
    pub status: ManuscriptStatus,
    /// Starts at 1 and grows with each resubmission
    pub version_number: u32,
    pub versions: Vec<ManuscriptVersion>,
    pub research_area: Option<String>,
    pub revision_deadline: Option<DateTime<Utc>>,
    pub publication: Option<PublicationDetails>,
    pub status_history: Vec<StatusChange>,
    /// Bumped on every mutation for optimistic concurrency
    pub row_version: u64,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manuscript {
    /// Create version 1 in `submitted`
    pub fn submit(author: UserId, new: NewManuscript, now: DateTime<Utc>) -> Result<Self> {
        new.validate()?;
        let keywords = new
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self {
            id: ManuscriptId::new(),
            journal_id: new.journal_id,
            title: new.title.trim().to_string(),
            abstract_text: new.abstract_text.trim().to_string(),
            keywords,
            primary_author: author,
            co_authors: new.co_authors,
            status: ManuscriptStatus::Submitted,
            version_number: 1,
            versions: vec![ManuscriptVersion {
                number: 1,
                file: new.file,
                submitted_at: now,
                note: None,
                archived: false,
            }],
            research_area: new.research_area,
            revision_deadline: None,
            publication: None,
            status_history: vec![StatusChange {
                from: None,
                to: ManuscriptStatus::Submitted,
                event: ManuscriptEvent::Submit.name().to_string(),
                actor: author,
                at: now,
                reason: None,
            }],
            row_version: 1,
            submitted_at: now,
            updated_at: now,
        })
    }

    /// The file of the current version
    pub fn current_file(&self) -> Option<&FileRef> {
        self.versions
            .iter()
            .find(|v| v.number == self.version_number)
            .map(|v| &v.file)
    }

    /// Apply an event, leaving the manuscript untouched on failure
    pub fn apply(
        &mut self,
        event: ManuscriptEvent,
        actor: UserId,
        now: DateTime<Utc>,
        revision: &RevisionConfig,
    ) -> Result<StatusChange> {
        let from = self.status;
        let to = from
            .target(&event)
            .ok_or_else(|| ReviewError::invalid_transition("Manuscript", from, &event))?;
        let name = event.name();

        let reason = match event {
            ManuscriptEvent::RequestRevision { severity } => {
                let days = match severity {
                    RevisionSeverity::Minor => revision.minor_deadline_days,
                    RevisionSeverity::Major => revision.major_deadline_days,
                };
                self.revision_deadline = Some(now + Duration::days(i64::from(days)));
                Some(format!("{} revision", severity))
            }
            ManuscriptEvent::Resubmit { file, reason } => {
                Validator::new()
                    .check(!file.is_blank(), "file", "must not be empty")
                    .require_text(&reason, "reason")
                    .finish()?;
                for version in &mut self.versions {
                    version.archived = true;
                }
                self.version_number += 1;
                self.versions.push(ManuscriptVersion {
                    number: self.version_number,
                    file,
                    submitted_at: now,
                    note: Some(reason.clone()),
                    archived: false,
                });
                self.revision_deadline = None;
                Some(reason)
            }
            ManuscriptEvent::Publish(details) => {
                details.validate()?;
                self.publication = Some(details);
                None
            }
            ManuscriptEvent::Withdraw { reason } => {
                Validator::new().require_text(&reason, "reason").finish()?;
                self.revision_deadline = None;
                Some(reason)
            }
            ManuscriptEvent::Accept | ManuscriptEvent::Reject => {
                self.revision_deadline = None;
                None
            }
            ManuscriptEvent::Submit
            | ManuscriptEvent::SendForReview
            | ManuscriptEvent::BeginPublication => None,
        };

        let change = StatusChange {
            from: Some(from),
            to,
            event: name.to_string(),
            actor,
            at: now,
            reason,
        };
        self.status = to;
        self.status_history.push(change.clone());
        self.touch(now);

        tracing::info!(
            manuscript_id = %self.id,
            from = %from,
            to = %to,
            event = name,
            version = self.version_number,
            "Manuscript status changed"
        );
        Ok(change)
    }

    /// Record a mutation for optimistic concurrency
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.row_version += 1;
    }
}
