//! Submission, triage, resubmission and withdrawal

use super::desk::{expired_assignment_event, DeskEntry, ManuscriptDesk};
use super::{status_event, EditorialOffice};
use crate::error::{FieldError, Result, ReviewError};
use crate::event::{EntityType, Event, EventPayload};
use crate::manuscript::{FileRef, Manuscript, ManuscriptEvent, NewManuscript};
use crate::id::{ManuscriptId, UserId};
use crate::role::{Operation, RequestContext, Role};

/// How a caller relates to a manuscript they want to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Viewer {
    Author,
    Editorial,
    /// Must hold an assignment on the manuscript
    Reviewer(UserId),
}

impl Viewer {
    /// Finish the check that needs the desk
    pub(crate) fn admit(&self, desk: &ManuscriptDesk) -> Result<()> {
        match self {
            Viewer::Reviewer(id) if desk.assignments.for_reviewer(id).next().is_none() => {
                Err(ReviewError::unauthorized(
                    id,
                    "view manuscript",
                    "no review assignment for this manuscript",
                ))
            }
            _ => Ok(()),
        }
    }
}

impl EditorialOffice {
    /// Classify the caller against a manuscript, or refuse them
    pub(crate) fn viewer(&self, ctx: &RequestContext, entry: &DeskEntry) -> Result<Viewer> {
        let directory = self.read_directory()?;
        let user = directory
            .get(&ctx.user_id)
            .filter(|u| u.is_active())
            .ok_or_else(|| {
                ReviewError::unauthorized(ctx.user_id, "view manuscript", "unknown or inactive user")
            })?;
        match user.active_role {
            Role::Author if entry.primary_author == user.id => Ok(Viewer::Author),
            role @ (Role::Editor | Role::Admin)
                if user.holds_for(role, Some(&entry.journal_id)) =>
            {
                Ok(Viewer::Editorial)
            }
            Role::Reviewer => Ok(Viewer::Reviewer(user.id)),
            role => Err(ReviewError::unauthorized(
                user.id,
                "view manuscript",
                format!("{} has no access to this manuscript", role),
            )),
        }
    }

    /// Authorize a journal-scoped editorial operation on a manuscript
    pub(crate) fn authorize_editorial(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        entry: &DeskEntry,
    ) -> Result<()> {
        self.read_directory()?
            .authorize(ctx, operation, Some(&entry.journal_id))?;
        Ok(())
    }

    /// Authorize an author operation that only the primary author may perform
    fn authorize_primary_author(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        entry: &DeskEntry,
    ) -> Result<()> {
        self.read_directory()?.authorize(ctx, operation, None)?;
        if entry.primary_author != ctx.user_id {
            return Err(ReviewError::unauthorized(
                ctx.user_id,
                operation,
                "only the primary author may do this",
            ));
        }
        Ok(())
    }

    // ==================== Submission ====================

    /// Submit a new manuscript as version 1
    pub fn submit_manuscript(&self, ctx: &RequestContext, new: NewManuscript) -> Result<Manuscript> {
        self.read_directory()?
            .authorize(ctx, Operation::SubmitManuscript, None)?;
        if !self.read_journals()?.contains_key(&new.journal_id) {
            return Err(ReviewError::Validation(vec![FieldError::new(
                "journal_id",
                "unknown journal",
            )]));
        }

        let now = self.now();
        let manuscript = Manuscript::submit(ctx.user_id, new, now)?;
        self.write_index()?.desks.insert(
            manuscript.id,
            DeskEntry::new(ManuscriptDesk::new(manuscript.clone())),
        );
        tracing::info!(
            manuscript_id = %manuscript.id,
            journal_id = %manuscript.journal_id,
            author = %ctx.user_id,
            "Manuscript submitted"
        );
        self.record(
            Some(ctx),
            vec![Event::new(
                manuscript.id,
                EntityType::Manuscript,
                EventPayload::ManuscriptSubmitted {
                    journal_id: manuscript.journal_id.to_string(),
                    title: manuscript.title.clone(),
                },
                now,
            )],
        )?;
        Ok(manuscript)
    }

    /// Read one manuscript
    pub fn manuscript(&self, ctx: &RequestContext, id: &ManuscriptId) -> Result<Manuscript> {
        let entry = self.entry(id)?;
        let viewer = self.viewer(ctx, &entry)?;
        let desk = self.open_desk(&entry)?;
        viewer.admit(&desk)?;
        Ok(desk.manuscript.clone())
    }

    /// Manuscripts visible to the caller's active persona, oldest first
    ///
    /// Authors see their own submissions, editors the manuscripts of the
    /// journals they cover, and reviewers the manuscripts they review.
    pub fn manuscripts(&self, ctx: &RequestContext) -> Result<Vec<Manuscript>> {
        let mut visible = Vec::new();
        for entry in self.entries()? {
            let Ok(viewer) = self.viewer(ctx, &entry) else {
                continue;
            };
            let desk = self.open_desk(&entry)?;
            if viewer.admit(&desk).is_ok() {
                visible.push(desk.manuscript.clone());
            }
        }
        visible.sort_by_key(|m| (m.submitted_at, m.id));
        Ok(visible)
    }

    // ==================== Lifecycle ====================

    /// Triage a submitted or resubmitted manuscript into review
    pub fn send_for_review(&self, ctx: &RequestContext, id: &ManuscriptId) -> Result<Manuscript> {
        let entry = self.entry(id)?;
        self.authorize_editorial(ctx, Operation::SendForReview, &entry)?;

        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        let change = desk.manuscript.apply(
            ManuscriptEvent::SendForReview,
            ctx.user_id,
            now,
            &self.config.revision,
        )?;
        let events = vec![status_event(&change, &desk.manuscript)];
        self.record_desk(Some(ctx), &mut desk, events)?;
        Ok(desk.manuscript.clone())
    }

    /// Submit a revised version after a revision request
    ///
    /// The version number grows by one and the previous file is archived.
    /// Unless disabled in the workflow settings the manuscript goes straight
    /// back to review, and reviews still open on the old version expire.
    pub fn resubmit(
        &self,
        ctx: &RequestContext,
        id: &ManuscriptId,
        file: FileRef,
        reason: &str,
    ) -> Result<Manuscript> {
        let entry = self.entry(id)?;
        self.authorize_primary_author(ctx, Operation::ResubmitManuscript, &entry)?;

        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        let mut events = Vec::new();

        let change = desk.manuscript.apply(
            ManuscriptEvent::Resubmit {
                file,
                reason: reason.to_string(),
            },
            ctx.user_id,
            now,
            &self.config.revision,
        )?;
        events.push(status_event(&change, &desk.manuscript));

        if self.config.workflow.auto_return_to_review {
            let change = desk.manuscript.apply(
                ManuscriptEvent::SendForReview,
                ctx.user_id,
                now,
                &self.config.revision,
            )?;
            events.push(status_event(&change, &desk.manuscript));
        }

        let version = desk.manuscript.version_number;
        for (assignment_id, from) in desk.assignments.expire_stale(version, now) {
            events.push(expired_assignment_event(assignment_id, from, now));
        }

        self.record_desk(Some(ctx), &mut desk, events)?;
        Ok(desk.manuscript.clone())
    }

    /// Withdraw a manuscript that has not been decided yet
    pub fn withdraw(
        &self,
        ctx: &RequestContext,
        id: &ManuscriptId,
        reason: &str,
    ) -> Result<Manuscript> {
        let entry = self.entry(id)?;
        self.authorize_primary_author(ctx, Operation::WithdrawManuscript, &entry)?;

        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        let change = desk.manuscript.apply(
            ManuscriptEvent::Withdraw {
                reason: reason.to_string(),
            },
            ctx.user_id,
            now,
            &self.config.revision,
        )?;
        let mut events = vec![status_event(&change, &desk.manuscript)];
        for (assignment_id, from) in desk.assignments.close_active(now) {
            events.push(expired_assignment_event(assignment_id, from, now));
        }
        self.record_desk(Some(ctx), &mut desk, events)?;
        Ok(desk.manuscript.clone())
    }
}
