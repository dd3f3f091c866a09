//! Per-manuscript tracker of review assignments

use chrono::{DateTime, Duration, Utc};

use super::{AssignmentStatus, ReviewAssignment, ReviewDraft, ReviewTally};
use crate::error::{Result, ReviewError, Validator};
use crate::id::{AssignmentId, ManuscriptId, UserId};
use crate::invitation::InvitationToken;

/// Everything needed to open an assignment
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub manuscript_id: ManuscriptId,
    pub manuscript_version: u32,
    pub reviewer_id: UserId,
    pub status: AssignmentStatus,
    pub due_date: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
    pub invitation: Option<InvitationToken>,
}

/// Assignments for one manuscript across all of its versions
#[derive(Debug, Clone, Default)]
pub struct AssignmentTracker {
    assignments: Vec<ReviewAssignment>,
}

impl AssignmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tracker from persisted assignments
    pub fn from_assignments(assignments: Vec<ReviewAssignment>) -> Self {
        Self { assignments }
    }

    pub fn all(&self) -> &[ReviewAssignment] {
        &self.assignments
    }

    pub fn get(&self, id: &AssignmentId) -> Option<&ReviewAssignment> {
        self.assignments.iter().find(|a| a.id == *id)
    }

    /// The reviewer's non-terminal assignment, if any
    pub fn active_for(&self, reviewer: &UserId) -> Option<&ReviewAssignment> {
        self.assignments
            .iter()
            .find(|a| a.reviewer_id == *reviewer && a.status.is_active())
    }

    pub fn for_reviewer<'a>(
        &'a self,
        reviewer: &'a UserId,
    ) -> impl Iterator<Item = &'a ReviewAssignment> + 'a {
        self.assignments
            .iter()
            .filter(move |a| a.reviewer_id == *reviewer)
    }

    /// Open an assignment; at most one may be active per reviewer
    pub fn create(&mut self, new: NewAssignment, now: DateTime<Utc>) -> Result<&ReviewAssignment> {
        if self.active_for(&new.reviewer_id).is_some() {
            return Err(ReviewError::AlreadyAssigned {
                reviewer: new.reviewer_id.to_string(),
                manuscript: new.manuscript_id.to_string(),
            });
        }
        let index = self.assignments.len();
        self.assignments.push(ReviewAssignment {
            id: AssignmentId::new(),
            manuscript_id: new.manuscript_id,
            manuscript_version: new.manuscript_version,
            reviewer_id: new.reviewer_id,
            status: new.status,
            assigned_by: new.assigned_by,
            invitation: new.invitation,
            due_date: new.due_date,
            review: ReviewDraft::default(),
            decline_reason: None,
            created_at: now,
            started_at: None,
            submitted_at: None,
            updated_at: now,
        });
        Ok(&self.assignments[index])
    }

    /// Look up an assignment the reviewer owns
    fn owned_mut(&mut self, id: &AssignmentId, reviewer: &UserId) -> Result<&mut ReviewAssignment> {
        let assignment = self
            .assignments
            .iter_mut()
            .find(|a| a.id == *id)
            .ok_or_else(|| ReviewError::NotFound(format!("Assignment {}", id)))?;
        if assignment.reviewer_id != *reviewer {
            return Err(ReviewError::unauthorized(
                reviewer,
                "act on review assignment",
                "not the assigned reviewer",
            ));
        }
        Ok(assignment)
    }

    /// Accept or decline a direct assignment
    pub fn respond(
        &mut self,
        id: &AssignmentId,
        reviewer: &UserId,
        accept: bool,
        reason: Option<String>,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<&ReviewAssignment> {
        let assignment = self.owned_mut(id, reviewer)?;
        if assignment.status != AssignmentStatus::Invited {
            return Err(ReviewError::invalid_transition(
                "Assignment",
                assignment.status,
                if accept { "accept" } else { "decline" },
            ));
        }
        if accept {
            assignment.status = AssignmentStatus::Pending;
            assignment.due_date = due_date;
        } else {
            assignment.status = AssignmentStatus::Declined;
            assignment.decline_reason = reason;
        }
        assignment.updated_at = now;
        Ok(assignment)
    }

    /// Begin working on a review; a no-op when already in progress
    pub fn start(
        &mut self,
        id: &AssignmentId,
        reviewer: &UserId,
        now: DateTime<Utc>,
    ) -> Result<&ReviewAssignment> {
        let assignment = self.owned_mut(id, reviewer)?;
        match assignment.status {
            AssignmentStatus::InProgress => {}
            AssignmentStatus::Pending => {
                assignment.status = AssignmentStatus::InProgress;
                assignment.started_at = Some(now);
                assignment.updated_at = now;
            }
            status => return Err(ReviewError::invalid_transition("Assignment", status, "start")),
        }
        Ok(assignment)
    }

    /// Merge a partial review without changing status
    pub fn save_draft(
        &mut self,
        id: &AssignmentId,
        reviewer: &UserId,
        draft: ReviewDraft,
        scale_max: u8,
        now: DateTime<Utc>,
    ) -> Result<&ReviewAssignment> {
        let assignment = self.owned_mut(id, reviewer)?;
        if !assignment.status.is_editable() {
            return Err(ReviewError::invalid_transition(
                "Assignment",
                assignment.status,
                "save draft",
            ));
        }
        let mut v = Validator::new();
        draft.ratings.check(&mut v, scale_max, false);
        v.finish()?;

        assignment.review.merge(draft);
        assignment.updated_at = now;
        Ok(assignment)
    }

    /// Submit the final review; the merged content must be complete
    pub fn submit(
        &mut self,
        id: &AssignmentId,
        reviewer: &UserId,
        review: ReviewDraft,
        scale_max: u8,
        now: DateTime<Utc>,
    ) -> Result<&ReviewAssignment> {
        let assignment = self.owned_mut(id, reviewer)?;
        match assignment.status {
            AssignmentStatus::Completed => {
                return Err(ReviewError::AlreadySubmitted(id.to_string()));
            }
            AssignmentStatus::Pending | AssignmentStatus::InProgress => {}
            status => {
                return Err(ReviewError::invalid_transition("Assignment", status, "submit"));
            }
        }

        let mut merged = assignment.review.clone();
        merged.merge(review);
        let mut v = Validator::new();
        merged.ratings.check(&mut v, scale_max, true);
        v.check(
            merged.recommendation.is_some(),
            "recommendation",
            "is required",
        );
        v.finish()?;

        assignment.review = merged;
        assignment.status = AssignmentStatus::Completed;
        assignment.started_at.get_or_insert(now);
        assignment.submitted_at = Some(now);
        assignment.updated_at = now;
        Ok(assignment)
    }

    /// Step back from an accepted review
    pub fn withdraw(
        &mut self,
        id: &AssignmentId,
        reviewer: &UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&ReviewAssignment> {
        let assignment = self.owned_mut(id, reviewer)?;
        if !assignment.status.is_editable() {
            return Err(ReviewError::invalid_transition(
                "Assignment",
                assignment.status,
                "withdraw",
            ));
        }
        assignment.status = AssignmentStatus::Declined;
        assignment.decline_reason = reason;
        assignment.updated_at = now;
        Ok(assignment)
    }

    /// Expire unfinished reviews past their due date plus `grace_days`,
    /// returning each expired assignment with its previous status
    pub fn expire_overdue(
        &mut self,
        now: DateTime<Utc>,
        grace_days: Option<u32>,
    ) -> Vec<(AssignmentId, AssignmentStatus)> {
        let Some(grace) = grace_days else {
            return Vec::new();
        };
        let grace = Duration::days(i64::from(grace));
        let mut expired = Vec::new();
        for assignment in &mut self.assignments {
            if assignment.status.is_editable() && now > assignment.due_date + grace {
                expired.push((assignment.id, assignment.status));
                assignment.status = AssignmentStatus::Expired;
                assignment.updated_at = now;
            }
        }
        expired
    }

    /// Expire active assignments left over from earlier versions
    pub fn expire_stale(
        &mut self,
        current_version: u32,
        now: DateTime<Utc>,
    ) -> Vec<(AssignmentId, AssignmentStatus)> {
        let mut expired = Vec::new();
        for assignment in &mut self.assignments {
            if assignment.status.is_active() && assignment.manuscript_version < current_version {
                expired.push((assignment.id, assignment.status));
                assignment.status = AssignmentStatus::Expired;
                assignment.updated_at = now;
            }
        }
        expired
    }

    /// Expire every active assignment once the manuscript leaves review for good
    pub fn close_active(&mut self, now: DateTime<Utc>) -> Vec<(AssignmentId, AssignmentStatus)> {
        self.expire_stale(u32::MAX, now)
    }

    /// Aggregate the reviews of `version`
    ///
    /// Ready when every assignment that is neither declined nor expired has
    /// been completed and at least `min_completed` reviews are in.
    pub fn tally(&self, version: u32, min_completed: usize) -> ReviewTally {
        let mut tally = ReviewTally {
            manuscript_version: version,
            ..Default::default()
        };
        let mut scores = Vec::new();
        for assignment in self
            .assignments
            .iter()
            .filter(|a| a.manuscript_version == version)
        {
            tally.total += 1;
            match assignment.status {
                AssignmentStatus::Completed => {
                    tally.completed += 1;
                    if let Some(rec) = assignment.review.recommendation {
                        tally.recommendations.push(rec);
                    }
                    scores.extend(assignment.review.ratings.mean());
                }
                AssignmentStatus::Declined => tally.declined += 1,
                AssignmentStatus::Expired => tally.expired += 1,
                AssignmentStatus::Invited
                | AssignmentStatus::Pending
                | AssignmentStatus::InProgress => tally.outstanding += 1,
            }
        }
        if !scores.is_empty() {
            tally.mean_score = Some(scores.iter().sum::<f64>() / scores.len() as f64);
        }
        tally.ready_for_decision =
            tally.outstanding == 0 && tally.completed >= min_completed.max(1);
        tally
    }
}
