//! Manuscript state machine
//!
//! State transitions:
//! ```text
//! Submitted ──SendForReview──→ UnderReview ──Accept──→ Accepted ──BeginPublication──→ UnderPublication ──Publish──→ Published
//!     │                          │    ↑
//!     │                RequestRevision │ SendForReview
//!     │                          ↓    │
//!     │                     Correction ──Resubmit──→ Resubmitted
//!     │
//!     └── Reject (from Submitted, UnderReview, Resubmitted) ──→ Rejected
//!         Withdraw (from Submitted, UnderReview, Correction, Resubmitted) ──→ Withdrawn
//! ```

use serde::{Deserialize, Serialize};

use super::{FileRef, PublicationDetails};

/// Lifecycle status of a manuscript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManuscriptStatus {
    Submitted,
    UnderReview,
    /// Author asked to revise
    Correction,
    Resubmitted,
    Accepted,
    UnderPublication,
    Published,
    Rejected,
    Withdrawn,
}

impl ManuscriptStatus {
    pub const ALL: [ManuscriptStatus; 9] = [
        ManuscriptStatus::Submitted,
        ManuscriptStatus::UnderReview,
        ManuscriptStatus::Correction,
        ManuscriptStatus::Resubmitted,
        ManuscriptStatus::Accepted,
        ManuscriptStatus::UnderPublication,
        ManuscriptStatus::Published,
        ManuscriptStatus::Rejected,
        ManuscriptStatus::Withdrawn,
    ];

    /// The status reached by applying `event`, or `None` if not allowed
    pub fn target(&self, event: &ManuscriptEvent) -> Option<ManuscriptStatus> {
        use ManuscriptStatus::*;
        match (self, event) {
            (Submitted | Resubmitted, ManuscriptEvent::SendForReview) => Some(UnderReview),
            (UnderReview, ManuscriptEvent::RequestRevision { .. }) => Some(Correction),
            (UnderReview, ManuscriptEvent::Accept) => Some(Accepted),
            (Submitted | UnderReview | Resubmitted, ManuscriptEvent::Reject) => Some(Rejected),
            (Correction, ManuscriptEvent::Resubmit { .. }) => Some(Resubmitted),
            (Accepted, ManuscriptEvent::BeginPublication) => Some(UnderPublication),
            (UnderPublication, ManuscriptEvent::Publish(_)) => Some(Published),
            (
                Submitted | UnderReview | Correction | Resubmitted,
                ManuscriptEvent::Withdraw { .. },
            ) => Some(Withdrawn),
            // Submit only creates a manuscript
            _ => None,
        }
    }

    /// Check if the status is final
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ManuscriptStatus::Published | ManuscriptStatus::Rejected | ManuscriptStatus::Withdrawn
        )
    }

    /// Whether reviewers may be invited or may accept invitations
    pub fn accepts_reviewers(&self) -> bool {
        matches!(
            self,
            ManuscriptStatus::Submitted
                | ManuscriptStatus::UnderReview
                | ManuscriptStatus::Resubmitted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ManuscriptStatus::Submitted => "submitted",
            ManuscriptStatus::UnderReview => "under_review",
            ManuscriptStatus::Correction => "correction",
            ManuscriptStatus::Resubmitted => "resubmitted",
            ManuscriptStatus::Accepted => "accepted",
            ManuscriptStatus::UnderPublication => "under_publication",
            ManuscriptStatus::Published => "published",
            ManuscriptStatus::Rejected => "rejected",
            ManuscriptStatus::Withdrawn => "withdrawn",
        }
    }
}

impl std::fmt::Display for ManuscriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much work a revision request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionSeverity {
    Minor,
    Major,
}

impl std::fmt::Display for RevisionSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevisionSeverity::Minor => write!(f, "minor"),
            RevisionSeverity::Major => write!(f, "major"),
        }
    }
}

/// An event applied to a manuscript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ManuscriptEvent {
    Submit,
    SendForReview,
    RequestRevision {
        severity: RevisionSeverity,
    },
    Resubmit {
        file: FileRef,
        reason: String,
    },
    Accept,
    Reject,
    BeginPublication,
    Publish(PublicationDetails),
    Withdraw {
        reason: String,
    },
}

impl ManuscriptEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ManuscriptEvent::Submit => "submit",
            ManuscriptEvent::SendForReview => "send_for_review",
            ManuscriptEvent::RequestRevision { .. } => "request_revision",
            ManuscriptEvent::Resubmit { .. } => "resubmit",
            ManuscriptEvent::Accept => "accept",
            ManuscriptEvent::Reject => "reject",
            ManuscriptEvent::BeginPublication => "begin_publication",
            ManuscriptEvent::Publish(_) => "publish",
            ManuscriptEvent::Withdraw { .. } => "withdraw",
        }
    }
}

impl std::fmt::Display for ManuscriptEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resubmit() -> ManuscriptEvent {
        ManuscriptEvent::Resubmit {
            file: FileRef::new("files/v2.pdf"),
            reason: "fixed typos".to_string(),
        }
    }

    #[test]
    fn test_submitted_transitions() {
        let s = ManuscriptStatus::Submitted;
        assert_eq!(
            s.target(&ManuscriptEvent::SendForReview),
            Some(ManuscriptStatus::UnderReview)
        );
        assert_eq!(s.target(&ManuscriptEvent::Reject), Some(ManuscriptStatus::Rejected));
        assert_eq!(s.target(&ManuscriptEvent::Accept), None);
        assert_eq!(s.target(&ManuscriptEvent::Submit), None);
    }

    #[test]
    fn test_correction_only_resubmits_or_withdraws() {
        let s = ManuscriptStatus::Correction;
        assert_eq!(s.target(&resubmit()), Some(ManuscriptStatus::Resubmitted));
        assert_eq!(
            s.target(&ManuscriptEvent::Withdraw {
                reason: "x".to_string()
            }),
            Some(ManuscriptStatus::Withdrawn)
        );
        assert_eq!(s.target(&ManuscriptEvent::SendForReview), None);
        assert_eq!(s.target(&ManuscriptEvent::Reject), None);
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let events = [
            ManuscriptEvent::Submit,
            ManuscriptEvent::SendForReview,
            ManuscriptEvent::Accept,
            ManuscriptEvent::Reject,
            ManuscriptEvent::BeginPublication,
            resubmit(),
        ];
        for status in ManuscriptStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for event in &events {
                assert_eq!(status.target(event), None, "{} on {}", event, status);
            }
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ManuscriptStatus::UnderPublication).unwrap();
        assert_eq!(json, "\"under_publication\"");
    }
}
