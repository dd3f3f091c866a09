//! Review assignment types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Validator;
use crate::id::{AssignmentId, ManuscriptId, UserId};
use crate::invitation::InvitationToken;
use crate::manuscript::FileRef;

/// Lifecycle of a review assignment
///
/// ```text
/// Invited → Pending → InProgress → Completed
///    ↓         ↓          ↓
/// Declined  Declined/Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Directly assigned, waiting for the reviewer to respond
    Invited,
    Pending,
    InProgress,
    Completed,
    Declined,
    Expired,
}

impl AssignmentStatus {
    /// Still expected to produce a review
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Invited | AssignmentStatus::Pending | AssignmentStatus::InProgress
        )
    }

    /// Whether the reviewer may edit the review content
    pub fn is_editable(&self) -> bool {
        matches!(self, AssignmentStatus::Pending | AssignmentStatus::InProgress)
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentStatus::Invited => write!(f, "invited"),
            AssignmentStatus::Pending => write!(f, "pending"),
            AssignmentStatus::InProgress => write!(f, "in_progress"),
            AssignmentStatus::Completed => write!(f, "completed"),
            AssignmentStatus::Declined => write!(f, "declined"),
            AssignmentStatus::Expired => write!(f, "expired"),
        }
    }
}

/// A reviewer's overall recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    MinorRevision,
    MajorRevision,
    Reject,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Accept => write!(f, "accept"),
            Recommendation::MinorRevision => write!(f, "minor_revision"),
            Recommendation::MajorRevision => write!(f, "major_revision"),
            Recommendation::Reject => write!(f, "reject"),
        }
    }
}

/// Per-criterion scores; unset while drafting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ratings {
    pub originality: Option<u8>,
    pub significance: Option<u8>,
    pub methodology: Option<u8>,
    pub clarity: Option<u8>,
}

impl Ratings {
    pub fn fields(&self) -> [(&'static str, Option<u8>); 4] {
        [
            ("originality", self.originality),
            ("significance", self.significance),
            ("methodology", self.methodology),
            ("clarity", self.clarity),
        ]
    }

    /// Overwrite the criteria set in `other`
    pub fn merge(&mut self, other: &Ratings) {
        self.originality = other.originality.or(self.originality);
        self.significance = other.significance.or(self.significance);
        self.methodology = other.methodology.or(self.methodology);
        self.clarity = other.clarity.or(self.clarity);
    }

    /// Check that every set score is on the scale; with `complete`, also
    /// that every criterion is set
    pub fn check(&self, v: &mut Validator, scale_max: u8, complete: bool) {
        for (name, value) in self.fields() {
            let field = format!("ratings.{}", name);
            match value {
                Some(score) => {
                    v.check(
                        (1..=scale_max).contains(&score),
                        &field,
                        &format!("must be between 1 and {}", scale_max),
                    );
                }
                None if complete => {
                    v.check(false, &field, "is required");
                }
                None => {}
            }
        }
    }

    /// Mean of the set scores
    pub fn mean(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .fields()
            .iter()
            .filter_map(|(_, v)| v.map(f64::from))
            .collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}

/// Review content; partial while drafting, complete once submitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewDraft {
    pub ratings: Ratings,
    pub recommendation: Option<Recommendation>,
    pub comments_to_author: Option<String>,
    /// Visible to editors only
    pub confidential_comments: Option<String>,
    pub report_file: Option<FileRef>,
}

impl ReviewDraft {
    /// Overwrite the parts set in `other`
    pub fn merge(&mut self, other: ReviewDraft) {
        self.ratings.merge(&other.ratings);
        if other.recommendation.is_some() {
            self.recommendation = other.recommendation;
        }
        if other.comments_to_author.is_some() {
            self.comments_to_author = other.comments_to_author;
        }
        if other.confidential_comments.is_some() {
            self.confidential_comments = other.confidential_comments;
        }
        if other.report_file.is_some() {
            self.report_file = other.report_file;
        }
    }
}

/// One reviewer's assignment to one manuscript version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAssignment {
    pub id: AssignmentId,
    pub manuscript_id: ManuscriptId,
    pub manuscript_version: u32,
    pub reviewer_id: UserId,
    pub status: AssignmentStatus,
    /// Editor who assigned the reviewer directly
    pub assigned_by: Option<UserId>,
    /// Invitation the assignment came from
    pub invitation: Option<InvitationToken>,
    pub due_date: DateTime<Utc>,
    pub review: ReviewDraft,
    pub decline_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate view of the reviews for the current manuscript version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewTally {
    pub manuscript_version: u32,
    pub total: usize,
    pub completed: usize,
    /// Invited, pending or in progress
    pub outstanding: usize,
    pub declined: usize,
    pub expired: usize,
    /// Recommendations of completed reviews
    pub recommendations: Vec<Recommendation>,
    /// Average of the completed reviews' mean ratings
    pub mean_score: Option<f64>,
    pub ready_for_decision: bool,
}
