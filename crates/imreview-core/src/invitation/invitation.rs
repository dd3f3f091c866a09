//! Reviewer invitations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::ReviewAssignment;
use crate::id::{AssignmentId, JournalId, ManuscriptId, UserId};

/// Opaque single-use token carried in the invitation link
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationToken(pub String);

impl InvitationToken {
    /// Generate a fresh unguessable token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InvitationToken {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl std::fmt::Display for InvitationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolution status of an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InvitationStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationStatus::Pending => write!(f, "pending"),
            InvitationStatus::Accepted => write!(f, "accepted"),
            InvitationStatus::Declined => write!(f, "declined"),
            InvitationStatus::Expired => write!(f, "expired"),
        }
    }
}

/// An invitation for one reviewer to review one manuscript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub token: InvitationToken,
    pub manuscript_id: ManuscriptId,
    pub journal_id: JournalId,
    /// Normalized address the invitation was sent to
    pub reviewer_email: String,
    pub invited_by: UserId,
    pub message: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: InvitationStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    /// Assignment created when the invitation was accepted
    pub assignment_id: Option<AssignmentId>,
}

impl Invitation {
    /// Status as of `now`; a pending invitation past its window reads as expired
    pub fn status_at(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.status == InvitationStatus::Pending && now > self.expires_at {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }

    /// Pending and still inside its window
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == InvitationStatus::Pending
    }
}

/// Result of accepting an invitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcceptOutcome {
    /// The reviewer now has a pending assignment
    Accepted {
        invitation: Invitation,
        assignment: ReviewAssignment,
    },
    /// No account exists for the invited address; the invitation stays
    /// pending until registration completes
    RegistrationRequired {
        token: InvitationToken,
        email: String,
    },
}
