//! Per-manuscript state held under one lock

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::assignment::{AssignmentStatus, AssignmentTracker};
use crate::correspondence::CorrespondenceLog;
use crate::decision::DecisionLog;
use crate::error::{Result, ReviewError};
use crate::event::{EntityType, Event, EventPayload};
use crate::id::{AssignmentId, JournalId, UserId};
use crate::invitation::InvitationLedger;
use crate::manuscript::Manuscript;

/// A manuscript together with everything attached to it
///
/// Assignment, review submission and decision readiness all read and write
/// the desk under its mutex, so they always see one consistent state.
#[derive(Debug, Clone)]
pub struct ManuscriptDesk {
    pub manuscript: Manuscript,
    pub invitations: InvitationLedger,
    pub assignments: AssignmentTracker,
    pub decisions: DecisionLog,
    pub correspondence: CorrespondenceLog,
}

impl ManuscriptDesk {
    pub fn new(manuscript: Manuscript) -> Self {
        Self {
            manuscript,
            invitations: InvitationLedger::new(),
            assignments: AssignmentTracker::new(),
            decisions: DecisionLog::new(),
            correspondence: CorrespondenceLog::new(),
        }
    }

    /// Materialize lazy expiry of invitations and overdue reviews
    pub(crate) fn refresh(
        &mut self,
        now: DateTime<Utc>,
        overdue_expiry_days: Option<u32>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        for token in self.invitations.expire_overdue(now) {
            tracing::debug!(manuscript_id = %self.manuscript.id, token = %token, "Invitation expired");
            events.push(Event::new(
                token,
                EntityType::Invitation,
                EventPayload::InvitationExpired,
                now,
            ));
        }
        for (id, from) in self.assignments.expire_overdue(now, overdue_expiry_days) {
            tracing::debug!(manuscript_id = %self.manuscript.id, assignment_id = %id, "Overdue review expired");
            events.push(expired_assignment_event(id, from, now));
        }
        events
    }
}

pub(crate) fn expired_assignment_event(
    id: AssignmentId,
    from: AssignmentStatus,
    now: DateTime<Utc>,
) -> Event {
    Event::new(
        id,
        EntityType::Assignment,
        EventPayload::AssignmentStatusChanged {
            from,
            to: AssignmentStatus::Expired,
        },
        now,
    )
}

/// Index entry for a manuscript: its immutable routing facts plus the desk
#[derive(Debug, Clone)]
pub(crate) struct DeskEntry {
    pub journal_id: JournalId,
    pub primary_author: UserId,
    pub desk: Arc<Mutex<ManuscriptDesk>>,
}

impl DeskEntry {
    pub fn new(desk: ManuscriptDesk) -> Self {
        Self {
            journal_id: desk.manuscript.journal_id,
            primary_author: desk.manuscript.primary_author,
            desk: Arc::new(Mutex::new(desk)),
        }
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, ManuscriptDesk>> {
        self.desk.lock().map_err(|_| ReviewError::poisoned("manuscript"))
    }
}
