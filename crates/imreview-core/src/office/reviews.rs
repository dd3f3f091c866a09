//! Reviewer invitations and review assignments

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::desk::{DeskEntry, ManuscriptDesk};
use super::manuscripts::Viewer;
use super::EditorialOffice;
use crate::assignment::{AssignmentStatus, NewAssignment, ReviewAssignment, ReviewDraft, ReviewTally};
use crate::error::{Result, ReviewError, Validator};
use crate::event::{EntityType, Event, EventPayload};
use crate::id::{AssignmentId, ManuscriptId, UserId};
use crate::invitation::{
    AcceptOutcome, Invitation, InvitationRequest, InvitationStatus, InvitationToken,
};
use crate::mailer::{DeliveryStatus, MailKind, OutgoingMail};
use crate::role::{Operation, RequestContext, Role, RoleDirectory};

/// An editor's request to invite a reviewer by email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteRequest {
    pub reviewer_email: String,
    /// Days until the invitation expires; defaults to the configured window
    #[serde(default)]
    pub due_days: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

impl EditorialOffice {
    fn review_due_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(i64::from(self.config.review.review_period_days))
    }

    // ==================== Invitations ====================

    /// Invite a reviewer by email and request the invitation mail
    ///
    /// Mail delivery is best effort; a failed send is logged and the
    /// invitation stands.
    pub fn invite_reviewer(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
        request: InviteRequest,
    ) -> Result<Invitation> {
        let entry = self.entry(manuscript_id)?;
        self.authorize_editorial(ctx, Operation::InviteReviewer, &entry)?;

        let max_days = self.config.invitation.max_window_days;
        let window_days = request
            .due_days
            .unwrap_or(self.config.invitation.default_window_days);
        let email = request.reviewer_email.trim();
        Validator::new()
            .check(email.contains('@'), "reviewer_email", "must be an email address")
            .check(
                (1..=max_days).contains(&window_days),
                "due_days",
                &format!("must be between 1 and {}", max_days),
            )
            .finish()?;

        let registered = self.read_directory()?.find_by_email(email).map(|u| u.id);

        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        if !desk.manuscript.status.accepts_reviewers() {
            return Err(ReviewError::invalid_transition(
                "Manuscript",
                desk.manuscript.status,
                "invite reviewer",
            ));
        }
        let already_invited = desk.invitations.open_for(email, now).is_some();
        let already_assigned = registered
            .map(|id| desk.assignments.active_for(&id).is_some())
            .unwrap_or(false);
        if already_invited || already_assigned {
            return Err(ReviewError::AlreadyAssigned {
                reviewer: email.to_string(),
                manuscript: manuscript_id.to_string(),
            });
        }

        let invitation = desk
            .invitations
            .issue(
                InvitationRequest {
                    manuscript_id: *manuscript_id,
                    journal_id: entry.journal_id,
                    reviewer_email: email.to_string(),
                    invited_by: ctx.user_id,
                    message: request.message.filter(|m| !m.trim().is_empty()),
                    window_days,
                },
                now,
            )
            .clone();
        self.write_index()?
            .tokens
            .insert(invitation.token.clone(), *manuscript_id);

        let mail = invitation_mail(&invitation, &desk.manuscript.title);
        if self.mailer.send(&mail) == DeliveryStatus::Failed {
            tracing::warn!(
                manuscript_id = %manuscript_id,
                to = %invitation.reviewer_email,
                "Invitation mail could not be delivered"
            );
        }

        tracing::info!(
            manuscript_id = %manuscript_id,
            reviewer = %invitation.reviewer_email,
            expires_at = %invitation.expires_at,
            "Reviewer invited"
        );
        self.record_desk(
            Some(ctx),
            &mut desk,
            vec![Event::new(
                &invitation.token,
                EntityType::Invitation,
                EventPayload::InvitationIssued {
                    manuscript_id: manuscript_id.to_string(),
                    reviewer_email: invitation.reviewer_email.clone(),
                    expires_at: invitation.expires_at,
                },
                now,
            )],
        )?;
        Ok(invitation)
    }

    /// Look up an invitation by token; the token itself is the credential
    pub fn invitation(&self, token: &InvitationToken) -> Result<Invitation> {
        let entry = self.entry_for_token(token)?;
        let desk = self.open_desk(&entry)?;
        desk.invitations
            .get(token)
            .cloned()
            .ok_or_else(|| ReviewError::NotFound(format!("Invitation {}", token)))
    }

    /// Current status of an invitation, expiring it if its window has passed
    pub fn invitation_status(&self, token: &InvitationToken) -> Result<InvitationStatus> {
        Ok(self.invitation(token)?.status)
    }

    /// Accept an invitation
    ///
    /// `caller` is the authenticated user, if any. When no account exists
    /// for the invited address the invitation stays pending and
    /// [`AcceptOutcome::RegistrationRequired`] is returned.
    pub fn accept_invitation(
        &self,
        caller: Option<&RequestContext>,
        token: &InvitationToken,
    ) -> Result<AcceptOutcome> {
        let entry = self.entry_for_token(token)?;
        let mut directory = self.write_directory()?;
        let mut desk = self.open_desk(&entry)?;

        let now = self.now();
        let email = desk.invitations.pending(token, now)?.reviewer_email.clone();
        let Some(reviewer) = directory.find_by_email(&email).map(|u| u.id) else {
            tracing::debug!(token = %token, "Invitation accept needs registration");
            return Ok(AcceptOutcome::RegistrationRequired {
                token: token.clone(),
                email,
            });
        };
        if let Some(ctx) = caller {
            if ctx.user_id != reviewer {
                return Err(ReviewError::unauthorized(
                    ctx.user_id,
                    "accept invitation",
                    "invitation was sent to another address",
                ));
            }
        }

        let (outcome, events) =
            self.accept_locked(&mut directory, &entry, &mut desk, token, reviewer, now)?;
        self.record_desk(caller, &mut desk, events)?;
        Ok(outcome)
    }

    /// Create the invited reviewer's account, then accept for them
    ///
    /// Registration and acceptance happen under the same locks, and the
    /// checks that could fail the accept run before the account exists.
    pub fn complete_registration(
        &self,
        token: &InvitationToken,
        display_name: &str,
    ) -> Result<AcceptOutcome> {
        let entry = self.entry_for_token(token)?;
        let mut directory = self.write_directory()?;
        let mut desk = self.open_desk(&entry)?;

        let now = self.now();
        let email = desk.invitations.pending(token, now)?.reviewer_email.clone();
        if !desk.manuscript.status.accepts_reviewers() {
            return Err(ReviewError::invalid_transition(
                "Manuscript",
                desk.manuscript.status,
                "accept invitation",
            ));
        }

        let mut events = Vec::new();
        let reviewer = match directory.find_by_email(&email) {
            Some(user) => user.id,
            None => {
                let user = directory.register_user(&email, display_name, now)?;
                events.push(
                    Event::new(
                        user.id,
                        EntityType::User,
                        EventPayload::UserRegistered {
                            email: user.email.clone(),
                        },
                        now,
                    )
                    .with_actor(user.id),
                );
                user.id
            }
        };

        let (outcome, accepted) =
            self.accept_locked(&mut directory, &entry, &mut desk, token, reviewer, now)?;
        events.extend(accepted);
        self.record_desk(None, &mut desk, events)?;
        Ok(outcome)
    }

    /// Shared tail of accept: grant, assignment, invitation resolution
    fn accept_locked(
        &self,
        directory: &mut RoleDirectory,
        entry: &DeskEntry,
        desk: &mut ManuscriptDesk,
        token: &InvitationToken,
        reviewer: UserId,
        now: DateTime<Utc>,
    ) -> Result<(AcceptOutcome, Vec<Event>)> {
        let user = directory.user(&reviewer)?;
        if !user.is_active() {
            return Err(ReviewError::unauthorized(
                reviewer,
                "accept invitation",
                "account is deactivated",
            ));
        }
        if !desk.manuscript.status.accepts_reviewers() {
            return Err(ReviewError::invalid_transition(
                "Manuscript",
                desk.manuscript.status,
                "accept invitation",
            ));
        }
        if desk.assignments.active_for(&reviewer).is_some() {
            return Err(ReviewError::AlreadyAssigned {
                reviewer: reviewer.to_string(),
                manuscript: desk.manuscript.id.to_string(),
            });
        }
        let invited_by = desk.invitations.pending(token, now)?.invited_by;

        let mut events = Vec::new();
        if directory.ensure_reviewer_grant(&reviewer, entry.journal_id, now)? {
            events.push(
                Event::new(
                    reviewer,
                    EntityType::User,
                    EventPayload::ReviewerRoleGranted {
                        journal_id: entry.journal_id.to_string(),
                    },
                    now,
                )
                .with_actor(reviewer),
            );
        }

        let assignment = desk
            .assignments
            .create(
                NewAssignment {
                    manuscript_id: desk.manuscript.id,
                    manuscript_version: desk.manuscript.version_number,
                    reviewer_id: reviewer,
                    status: AssignmentStatus::Pending,
                    due_date: self.review_due_date(now),
                    assigned_by: Some(invited_by),
                    invitation: Some(token.clone()),
                },
                now,
            )?
            .clone();
        let invitation = desk.invitations.accept(token, assignment.id, now)?.clone();
        self.write_index()?
            .assignments
            .insert(assignment.id, desk.manuscript.id);

        tracing::info!(
            manuscript_id = %desk.manuscript.id,
            reviewer = %reviewer,
            assignment_id = %assignment.id,
            "Invitation accepted"
        );
        events.push(
            Event::new(
                token,
                EntityType::Invitation,
                EventPayload::InvitationAccepted {
                    assignment_id: assignment.id.to_string(),
                },
                now,
            )
            .with_actor(reviewer),
        );
        events.push(assignment_created(&assignment, now).with_actor(reviewer));
        Ok((
            AcceptOutcome::Accepted {
                invitation,
                assignment,
            },
            events,
        ))
    }

    /// Decline an invitation; no assignment is created
    pub fn decline_invitation(
        &self,
        caller: Option<&RequestContext>,
        token: &InvitationToken,
        reason: Option<String>,
    ) -> Result<Invitation> {
        let entry = self.entry_for_token(token)?;
        let directory = self.read_directory()?;
        let mut desk = self.open_desk(&entry)?;

        let now = self.now();
        let email = desk.invitations.pending(token, now)?.reviewer_email.clone();
        if let Some(ctx) = caller {
            let matches = directory
                .get(&ctx.user_id)
                .map(|u| u.email == email)
                .unwrap_or(false);
            if !matches {
                return Err(ReviewError::unauthorized(
                    ctx.user_id,
                    "decline invitation",
                    "invitation was sent to another address",
                ));
            }
        }
        drop(directory);

        let invitation = desk.invitations.decline(token, reason, now)?.clone();
        tracing::info!(manuscript_id = %invitation.manuscript_id, token = %token, "Invitation declined");
        self.record_desk(
            caller,
            &mut desk,
            vec![Event::new(
                token,
                EntityType::Invitation,
                EventPayload::InvitationDeclined {
                    reason: invitation.decline_reason.clone(),
                },
                now,
            )],
        )?;
        Ok(invitation)
    }

    /// Invitations issued for a manuscript, for editors
    pub fn invitations_for(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
    ) -> Result<Vec<Invitation>> {
        let entry = self.entry(manuscript_id)?;
        self.authorize_editorial(ctx, Operation::ViewEditorial, &entry)?;
        let desk = self.open_desk(&entry)?;
        Ok(desk.invitations.all().to_vec())
    }

    // ==================== Assignments ====================

    /// Assign a registered reviewer directly; they still have to respond
    pub fn assign_reviewer(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
        reviewer_id: &UserId,
    ) -> Result<ReviewAssignment> {
        let entry = self.entry(manuscript_id)?;
        let reviewer_email = {
            let directory = self.read_directory()?;
            directory.authorize(ctx, Operation::AssignReviewer, Some(&entry.journal_id))?;
            let reviewer = directory.user(reviewer_id)?;
            if !reviewer.is_active()
                || !reviewer.holds_for(Role::Reviewer, Some(&entry.journal_id))
            {
                return Err(ReviewError::RoleNotApproved {
                    user: reviewer_id.to_string(),
                    role: Role::Reviewer.to_string(),
                });
            }
            reviewer.email.clone()
        };

        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        if !desk.manuscript.status.accepts_reviewers() {
            return Err(ReviewError::invalid_transition(
                "Manuscript",
                desk.manuscript.status,
                "assign reviewer",
            ));
        }
        if desk.invitations.open_for(&reviewer_email, now).is_some() {
            return Err(ReviewError::AlreadyAssigned {
                reviewer: reviewer_id.to_string(),
                manuscript: manuscript_id.to_string(),
            });
        }
        let version = desk.manuscript.version_number;
        let assignment = desk
            .assignments
            .create(
                NewAssignment {
                    manuscript_id: *manuscript_id,
                    manuscript_version: version,
                    reviewer_id: *reviewer_id,
                    status: AssignmentStatus::Invited,
                    due_date: self.review_due_date(now),
                    assigned_by: Some(ctx.user_id),
                    invitation: None,
                },
                now,
            )?
            .clone();
        self.write_index()?
            .assignments
            .insert(assignment.id, *manuscript_id);

        tracing::info!(
            manuscript_id = %manuscript_id,
            reviewer = %reviewer_id,
            assignment_id = %assignment.id,
            "Reviewer assigned"
        );
        self.record_desk(Some(ctx), &mut desk, vec![assignment_created(&assignment, now)])?;
        Ok(assignment)
    }

    /// Run a reviewer operation on one assignment under its desk lock
    fn with_assignment<F>(
        &self,
        ctx: &RequestContext,
        id: &AssignmentId,
        op: F,
    ) -> Result<ReviewAssignment>
    where
        F: FnOnce(&mut ManuscriptDesk, DateTime<Utc>) -> Result<(ReviewAssignment, Vec<Event>)>,
    {
        let entry = self.entry_for_assignment(id)?;
        self.read_directory()?
            .authorize(ctx, Operation::ConductReview, None)?;
        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        let (assignment, events) = op(&mut *desk, now)?;
        self.record_desk(Some(ctx), &mut desk, events)?;
        Ok(assignment)
    }

    /// Accept or decline a direct assignment
    pub fn respond_to_assignment(
        &self,
        ctx: &RequestContext,
        id: &AssignmentId,
        accept: bool,
        reason: Option<String>,
    ) -> Result<ReviewAssignment> {
        let due_date = self.review_due_date(self.now());
        self.with_assignment(ctx, id, |desk, now| {
            if accept && !desk.manuscript.status.accepts_reviewers() {
                return Err(ReviewError::invalid_transition(
                    "Manuscript",
                    desk.manuscript.status,
                    "accept assignment",
                ));
            }
            let assignment = desk
                .assignments
                .respond(id, &ctx.user_id, accept, reason, due_date, now)?
                .clone();
            tracing::info!(assignment_id = %id, status = %assignment.status, "Assignment answered");
            let event = status_changed(&assignment, AssignmentStatus::Invited, now);
            Ok((assignment, vec![event]))
        })
    }

    /// Begin work on a review
    pub fn start_review(&self, ctx: &RequestContext, id: &AssignmentId) -> Result<ReviewAssignment> {
        self.with_assignment(ctx, id, |desk, now| {
            let before = desk
                .assignments
                .get(id)
                .map(|a| a.status)
                .ok_or_else(|| ReviewError::NotFound(format!("Assignment {}", id)))?;
            let assignment = desk.assignments.start(id, &ctx.user_id, now)?.clone();
            let events = if before == assignment.status {
                Vec::new()
            } else {
                tracing::info!(assignment_id = %id, "Review started");
                vec![status_changed(&assignment, before, now)]
            };
            Ok((assignment, events))
        })
    }

    /// Save a partial review without submitting it
    pub fn save_review_draft(
        &self,
        ctx: &RequestContext,
        id: &AssignmentId,
        draft: ReviewDraft,
    ) -> Result<ReviewAssignment> {
        let scale_max = self.config.review.rating_scale_max;
        self.with_assignment(ctx, id, |desk, now| {
            let assignment = desk
                .assignments
                .save_draft(id, &ctx.user_id, draft, scale_max, now)?
                .clone();
            let event = Event::new(id, EntityType::Assignment, EventPayload::ReviewDraftSaved, now);
            Ok((assignment, vec![event]))
        })
    }

    /// Submit the final review; the merged draft must be complete
    pub fn submit_review(
        &self,
        ctx: &RequestContext,
        id: &AssignmentId,
        review: ReviewDraft,
    ) -> Result<ReviewAssignment> {
        let scale_max = self.config.review.rating_scale_max;
        self.with_assignment(ctx, id, |desk, now| {
            let before = desk
                .assignments
                .get(id)
                .map(|a| a.status)
                .ok_or_else(|| ReviewError::NotFound(format!("Assignment {}", id)))?;
            let assignment = desk
                .assignments
                .submit(id, &ctx.user_id, review, scale_max, now)?
                .clone();
            tracing::info!(
                manuscript_id = %assignment.manuscript_id,
                assignment_id = %id,
                "Review submitted"
            );
            let events = vec![
                status_changed(&assignment, before, now),
                Event::new(
                    id,
                    EntityType::Assignment,
                    EventPayload::ReviewSubmitted {
                        recommendation: assignment.review.recommendation,
                    },
                    now,
                ),
            ];
            Ok((assignment, events))
        })
    }

    /// Step back from an accepted review
    pub fn withdraw_from_review(
        &self,
        ctx: &RequestContext,
        id: &AssignmentId,
        reason: Option<String>,
    ) -> Result<ReviewAssignment> {
        self.with_assignment(ctx, id, |desk, now| {
            let before = desk
                .assignments
                .get(id)
                .map(|a| a.status)
                .ok_or_else(|| ReviewError::NotFound(format!("Assignment {}", id)))?;
            let assignment = desk
                .assignments
                .withdraw(id, &ctx.user_id, reason, now)?
                .clone();
            tracing::info!(assignment_id = %id, "Reviewer withdrew");
            Ok((assignment.clone(), vec![status_changed(&assignment, before, now)]))
        })
    }

    /// One assignment, for its reviewer or the journal's editors
    pub fn assignment(&self, ctx: &RequestContext, id: &AssignmentId) -> Result<ReviewAssignment> {
        let entry = self.entry_for_assignment(id)?;
        let viewer = self.viewer(ctx, &entry)?;
        let desk = self.open_desk(&entry)?;
        let assignment = desk
            .assignments
            .get(id)
            .cloned()
            .ok_or_else(|| ReviewError::NotFound(format!("Assignment {}", id)))?;
        match viewer {
            Viewer::Editorial => Ok(assignment),
            Viewer::Reviewer(reviewer) if assignment.reviewer_id == reviewer => Ok(assignment),
            _ => Err(ReviewError::unauthorized(
                ctx.user_id,
                "view assignment",
                "not the assigned reviewer",
            )),
        }
    }

    /// The caller's assignments across all manuscripts, newest first
    pub fn my_assignments(&self, ctx: &RequestContext) -> Result<Vec<ReviewAssignment>> {
        self.read_directory()?
            .authorize(ctx, Operation::ConductReview, None)?;
        let mut mine = Vec::new();
        for entry in self.entries()? {
            let desk = self.open_desk(&entry)?;
            mine.extend(desk.assignments.for_reviewer(&ctx.user_id).cloned());
        }
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    /// Every assignment of a manuscript, for editors
    pub fn assignments_for(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
    ) -> Result<Vec<ReviewAssignment>> {
        let entry = self.entry(manuscript_id)?;
        self.authorize_editorial(ctx, Operation::ViewEditorial, &entry)?;
        let desk = self.open_desk(&entry)?;
        Ok(desk.assignments.all().to_vec())
    }

    /// Aggregate the reviews of the manuscript's current version
    pub fn review_tally(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
    ) -> Result<ReviewTally> {
        let entry = self.entry(manuscript_id)?;
        self.authorize_editorial(ctx, Operation::ViewEditorial, &entry)?;
        let desk = self.open_desk(&entry)?;
        Ok(desk.assignments.tally(
            desk.manuscript.version_number,
            self.config.review.min_completed_reviews,
        ))
    }
}

fn invitation_mail(invitation: &Invitation, title: &str) -> OutgoingMail {
    let mut body = format!(
        "You are invited to review \"{}\".\n\nInvitation token: {}\nRespond before {}.\n",
        title,
        invitation.token,
        invitation.expires_at.format("%Y-%m-%d"),
    );
    if let Some(message) = &invitation.message {
        body.push('\n');
        body.push_str(message);
        body.push('\n');
    }
    OutgoingMail {
        kind: MailKind::ReviewInvitation,
        to: invitation.reviewer_email.clone(),
        subject: format!("Invitation to review: {}", title),
        body,
    }
}

fn assignment_created(assignment: &ReviewAssignment, now: DateTime<Utc>) -> Event {
    Event::new(
        assignment.id,
        EntityType::Assignment,
        EventPayload::AssignmentCreated {
            manuscript_id: assignment.manuscript_id.to_string(),
            reviewer_id: assignment.reviewer_id.to_string(),
            status: assignment.status,
        },
        now,
    )
}

fn status_changed(assignment: &ReviewAssignment, from: AssignmentStatus, now: DateTime<Utc>) -> Event {
    Event::new(
        assignment.id,
        EntityType::Assignment,
        EventPayload::AssignmentStatusChanged {
            from,
            to: assignment.status,
        },
        now,
    )
}
