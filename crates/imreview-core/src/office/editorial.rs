//! Decisions, publication and correspondence

use super::desk::{expired_assignment_event, DeskEntry};
use super::manuscripts::Viewer;
use super::{status_event, EditorialOffice};
use crate::correspondence::{CorrespondenceRecord, DeliveryStatus, NewCorrespondence};
use crate::decision::{Decision, DecisionPayload, EditorialDecisionProcessor, PublicationRequest};
use crate::error::{FieldError, Result, ReviewError};
use crate::event::{EntityType, Event, EventPayload};
use crate::id::{ManuscriptId, RecordId};
use crate::mailer::{MailKind, OutgoingMail};
use crate::manuscript::Manuscript;
use crate::role::{Operation, RequestContext, Role};

impl EditorialOffice {
    // ==================== Decisions ====================

    /// Record the editorial decision on the current version
    ///
    /// Accept and revision requests need a complete set of reviews; a
    /// rejection may be issued at any point before a decision exists.
    pub fn record_decision(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
        payload: DecisionPayload,
    ) -> Result<Decision> {
        let entry = self.entry(manuscript_id)?;
        self.authorize_editorial(ctx, Operation::RecordDecision, &entry)?;

        let now = self.now();
        let mut guard = self.open_desk(&entry)?;
        let desk = &mut *guard;
        let tally = desk.assignments.tally(
            desk.manuscript.version_number,
            self.config.review.min_completed_reviews,
        );
        let (decision, change) = EditorialDecisionProcessor::new(&self.config).decide(
            &mut desk.decisions,
            &mut desk.manuscript,
            &tally,
            payload,
            ctx.user_id,
            now,
        )?;

        let mut events = vec![
            Event::new(
                decision.id,
                EntityType::Decision,
                EventPayload::DecisionRecorded {
                    manuscript_id: manuscript_id.to_string(),
                    decision_type: decision.decision_type,
                    version: decision.manuscript_version,
                },
                now,
            ),
            status_event(&change, &desk.manuscript),
        ];
        for (assignment_id, from) in desk.assignments.close_active(now) {
            events.push(expired_assignment_event(assignment_id, from, now));
        }
        self.record_desk(Some(ctx), desk, events)?;
        Ok(decision)
    }

    /// Decisions on a manuscript across all versions, oldest first
    pub fn decisions_for(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
    ) -> Result<Vec<Decision>> {
        let entry = self.entry(manuscript_id)?;
        self.require_party(ctx, &entry, "view decisions")?;
        let desk = self.open_desk(&entry)?;
        Ok(desk.decisions.all().to_vec())
    }

    // ==================== Publication ====================

    /// Move an accepted manuscript into production
    pub fn begin_publication(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
    ) -> Result<Manuscript> {
        let entry = self.entry(manuscript_id)?;
        self.authorize_editorial(ctx, Operation::ManagePublication, &entry)?;

        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        let change = EditorialDecisionProcessor::new(&self.config).begin_publication(
            &mut desk.manuscript,
            ctx.user_id,
            now,
        )?;
        let events = vec![status_event(&change, &desk.manuscript)];
        self.record_desk(Some(ctx), &mut desk, events)?;
        Ok(desk.manuscript.clone())
    }

    /// Publish with volume, issue, pages and DOI
    pub fn publish(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
        request: PublicationRequest,
    ) -> Result<Manuscript> {
        let entry = self.entry(manuscript_id)?;
        self.authorize_editorial(ctx, Operation::ManagePublication, &entry)?;

        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        let changes = EditorialDecisionProcessor::new(&self.config).publish(
            &mut desk.manuscript,
            &request,
            ctx.user_id,
            now,
        )?;
        let events = changes
            .iter()
            .map(|change| status_event(change, &desk.manuscript))
            .collect();
        self.record_desk(Some(ctx), &mut desk, events)?;
        Ok(desk.manuscript.clone())
    }

    // ==================== Correspondence ====================

    /// Authors and the journal's editors are the parties to correspondence
    fn require_party(&self, ctx: &RequestContext, entry: &DeskEntry, operation: &str) -> Result<()> {
        match self.viewer(ctx, entry)? {
            Viewer::Author | Viewer::Editorial => Ok(()),
            Viewer::Reviewer(_) => Err(ReviewError::unauthorized(
                ctx.user_id,
                operation,
                "reviewers are not party to editorial correspondence",
            )),
        }
    }

    /// Log a message about a manuscript and optionally deliver it
    ///
    /// Delivery is attempted before the record is written so the record
    /// carries the outcome. Editorial senders deliver to the primary author
    /// unless another recipient is given.
    pub fn send_correspondence(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
        mut message: NewCorrespondence,
    ) -> Result<CorrespondenceRecord> {
        let entry = self.entry(manuscript_id)?;
        let (sender_role, author_email) = {
            let directory = self.read_directory()?;
            let sender = directory.authorize(ctx, Operation::SendCorrespondence, None)?;
            let role = sender.active_role;
            let allowed = match role {
                Role::Author => entry.primary_author == sender.id,
                Role::Editor | Role::Admin => sender.holds_for(role, Some(&entry.journal_id)),
                Role::Reviewer => false,
            };
            if !allowed {
                return Err(ReviewError::unauthorized(
                    ctx.user_id,
                    Operation::SendCorrespondence,
                    "not a party to this manuscript",
                ));
            }
            let author_email = directory
                .get(&entry.primary_author)
                .map(|u| u.email.clone());
            (role, author_email)
        };

        message.validate()?;
        message.recipient = message
            .recipient
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if message.deliver && message.recipient.is_none() {
            message.recipient = match sender_role {
                Role::Author => None,
                _ => author_email,
            };
            if message.recipient.is_none() {
                return Err(ReviewError::Validation(vec![FieldError::new(
                    "recipient",
                    "is required to deliver this message",
                )]));
            }
        }

        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        let delivery = match (&message.recipient, message.deliver) {
            (Some(to), true) => {
                let status = self.mailer.send(&OutgoingMail {
                    kind: MailKind::Correspondence,
                    to: to.clone(),
                    subject: message.subject.trim().to_string(),
                    body: message.body.clone(),
                });
                if status == DeliveryStatus::Failed {
                    tracing::warn!(manuscript_id = %manuscript_id, to = %to, "Correspondence could not be delivered");
                }
                status
            }
            _ => DeliveryStatus::NotAttempted,
        };

        let record = desk
            .correspondence
            .append(*manuscript_id, ctx.user_id, sender_role, message, delivery, now)?
            .clone();
        self.write_index()?.records.insert(record.id, *manuscript_id);

        tracing::info!(
            manuscript_id = %manuscript_id,
            record_id = %record.id,
            delivery = %record.delivery,
            "Correspondence recorded"
        );
        self.record_desk(
            Some(ctx),
            &mut desk,
            vec![Event::new(
                record.id,
                EntityType::Correspondence,
                EventPayload::CorrespondenceRecorded {
                    manuscript_id: manuscript_id.to_string(),
                    delivery,
                },
                now,
            )],
        )?;
        Ok(record)
    }

    /// Mark a record read; marking it again changes nothing
    pub fn mark_correspondence_read(
        &self,
        ctx: &RequestContext,
        record_id: &RecordId,
    ) -> Result<CorrespondenceRecord> {
        let entry = self.entry_for_record(record_id)?;
        self.require_party(ctx, &entry, "read correspondence")?;

        let now = self.now();
        let mut desk = self.open_desk(&entry)?;
        if desk.correspondence.mark_read(record_id, now)? {
            self.record_desk(
                Some(ctx),
                &mut desk,
                vec![Event::new(
                    record_id,
                    EntityType::Correspondence,
                    EventPayload::CorrespondenceRead,
                    now,
                )],
            )?;
        }
        desk.correspondence
            .get(record_id)
            .cloned()
            .ok_or_else(|| ReviewError::NotFound(format!("Correspondence {}", record_id)))
    }

    /// Correspondence on a manuscript in send order
    pub fn correspondence_for(
        &self,
        ctx: &RequestContext,
        manuscript_id: &ManuscriptId,
    ) -> Result<Vec<CorrespondenceRecord>> {
        let entry = self.entry(manuscript_id)?;
        self.require_party(ctx, &entry, "view correspondence")?;
        let desk = self.open_desk(&entry)?;
        Ok(desk.correspondence.all().to_vec())
    }

    pub fn unread_count(&self, ctx: &RequestContext, manuscript_id: &ManuscriptId) -> Result<usize> {
        let entry = self.entry(manuscript_id)?;
        self.require_party(ctx, &entry, "view correspondence")?;
        let desk = self.open_desk(&entry)?;
        Ok(desk.correspondence.unread_count())
    }
}
