//! Editorial decision types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{DecisionId, ManuscriptId, UserId};
use crate::manuscript::{ManuscriptEvent, RevisionSeverity};

/// The kind of ruling an editor makes on a manuscript version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Accept,
    Reject,
    RequestRevision,
}

impl DecisionType {
    /// Whether the decision may be taken before reviews are in
    pub fn needs_reviews(&self) -> bool {
        !matches!(self, DecisionType::Reject)
    }
}

impl std::fmt::Display for DecisionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionType::Accept => write!(f, "accept"),
            DecisionType::Reject => write!(f, "reject"),
            DecisionType::RequestRevision => write!(f, "request_revision"),
        }
    }
}

/// What the editor submits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPayload {
    pub decision_type: DecisionType,
    #[serde(default)]
    pub severity: Option<RevisionSeverity>,
    pub reasoning: String,
}

impl DecisionPayload {
    pub fn accept(reasoning: impl Into<String>) -> Self {
        Self {
            decision_type: DecisionType::Accept,
            severity: None,
            reasoning: reasoning.into(),
        }
    }

    pub fn reject(reasoning: impl Into<String>) -> Self {
        Self {
            decision_type: DecisionType::Reject,
            severity: None,
            reasoning: reasoning.into(),
        }
    }

    pub fn revise(severity: RevisionSeverity, reasoning: impl Into<String>) -> Self {
        Self {
            decision_type: DecisionType::RequestRevision,
            severity: Some(severity),
            reasoning: reasoning.into(),
        }
    }

    /// The manuscript event this decision applies; `None` when a revision
    /// request lacks its severity
    pub fn event(&self) -> Option<ManuscriptEvent> {
        match self.decision_type {
            DecisionType::Accept => Some(ManuscriptEvent::Accept),
            DecisionType::Reject => Some(ManuscriptEvent::Reject),
            DecisionType::RequestRevision => self
                .severity
                .map(|severity| ManuscriptEvent::RequestRevision { severity }),
        }
    }
}

/// A recorded editorial decision on one manuscript version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub manuscript_id: ManuscriptId,
    pub manuscript_version: u32,
    pub decision_type: DecisionType,
    pub severity: Option<RevisionSeverity>,
    pub reasoning: String,
    pub editor_id: UserId,
    pub decided_at: DateTime<Utc>,
}

/// Publication metadata supplied by the editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRequest {
    pub volume: u32,
    pub issue: u32,
    #[serde(default)]
    pub page_start: Option<u32>,
    #[serde(default)]
    pub page_end: Option<u32>,
    /// DOI suffix; generated from volume, issue and manuscript id when unset
    #[serde(default)]
    pub doi_suffix: Option<String>,
}

/// Decisions for one manuscript, oldest first
#[derive(Debug, Clone, Default)]
pub struct DecisionLog {
    decisions: Vec<Decision>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted decisions
    pub fn from_decisions(decisions: Vec<Decision>) -> Self {
        Self { decisions }
    }

    pub fn all(&self) -> &[Decision] {
        &self.decisions
    }

    /// The decision recorded for `version`, if any
    pub fn active_for(&self, version: u32) -> Option<&Decision> {
        self.decisions
            .iter()
            .find(|d| d.manuscript_version == version)
    }

    pub(crate) fn push(&mut self, decision: Decision) -> &Decision {
        let index = self.decisions.len();
        self.decisions.push(decision);
        &self.decisions[index]
    }
}
