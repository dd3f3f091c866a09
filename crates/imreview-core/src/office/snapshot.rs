//! Whole-office snapshots for persistence

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::desk::{DeskEntry, ManuscriptDesk};
use super::{DeskIndex, EditorialOffice};
use crate::assignment::{AssignmentTracker, ReviewAssignment};
use crate::correspondence::{CorrespondenceLog, CorrespondenceRecord};
use crate::decision::{Decision, DecisionLog};
use crate::error::{PersistenceError, Result, ReviewError};
use crate::event::{Event, EventStore, InMemoryEventStore};
use crate::id::ManuscriptId;
use crate::invitation::{Invitation, InvitationLedger};
use crate::journal::Journal;
use crate::manuscript::Manuscript;
use crate::role::{RoleDirectory, User};

/// Everything the office knows, as flat lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficeSnapshot {
    pub users: Vec<User>,
    pub journals: Vec<Journal>,
    pub manuscripts: Vec<Manuscript>,
    pub invitations: Vec<Invitation>,
    pub assignments: Vec<ReviewAssignment>,
    pub decisions: Vec<Decision>,
    pub correspondence: Vec<CorrespondenceRecord>,
    pub events: Vec<Event>,
}

impl OfficeSnapshot {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.journals.is_empty() && self.manuscripts.is_empty()
    }
}

/// Per-manuscript collections while regrouping a snapshot
#[derive(Default)]
struct Parts {
    invitations: Vec<Invitation>,
    assignments: Vec<ReviewAssignment>,
    decisions: Vec<Decision>,
    correspondence: Vec<CorrespondenceRecord>,
}

impl ManuscriptDesk {
    fn parts(&self) -> Parts {
        Parts {
            invitations: self.invitations.all().to_vec(),
            assignments: self.assignments.all().to_vec(),
            decisions: self.decisions.all().to_vec(),
            correspondence: self.correspondence.all().to_vec(),
        }
    }
}

fn orphan(kind: &str, manuscript_id: &ManuscriptId) -> ReviewError {
    ReviewError::Persistence(PersistenceError::Serialization(format!(
        "{} references unknown manuscript {}",
        kind, manuscript_id
    )))
}

impl EditorialOffice {
    /// Copy out the full state
    ///
    /// Desks are locked one at a time, so the copy is consistent per
    /// manuscript. Lists come out in creation order.
    pub fn snapshot(&self) -> Result<OfficeSnapshot> {
        let mut snapshot = OfficeSnapshot::default();
        {
            let directory = self.read_directory()?;
            snapshot.users = directory.all().cloned().collect();
        }
        snapshot.users.sort_by_key(|u| (u.created_at, u.id));
        snapshot.journals = self.read_journals()?.values().cloned().collect();
        snapshot.journals.sort_by_key(|j| (j.created_at, j.id));

        let mut desks = Vec::new();
        for entry in self.entries()? {
            let desk = entry.lock()?;
            desks.push((desk.manuscript.clone(), desk.parts()));
        }
        desks.sort_by_key(|(m, _)| (m.submitted_at, m.id));
        for (manuscript, part) in desks {
            snapshot.manuscripts.push(manuscript);
            snapshot.invitations.extend(part.invitations);
            snapshot.assignments.extend(part.assignments);
            snapshot.decisions.extend(part.decisions);
            snapshot.correspondence.extend(part.correspondence);
        }

        snapshot.events = self
            .lock_events()?
            .all_events()
            .into_iter()
            .cloned()
            .collect();
        Ok(snapshot)
    }

    /// Replace the office state with a snapshot
    ///
    /// Fails without touching anything when a record points at a manuscript
    /// the snapshot does not contain.
    pub fn restore(&self, snapshot: OfficeSnapshot) -> Result<()> {
        let mut parts: HashMap<ManuscriptId, Parts> = snapshot
            .manuscripts
            .iter()
            .map(|m| (m.id, Parts::default()))
            .collect();
        for invitation in snapshot.invitations {
            parts
                .get_mut(&invitation.manuscript_id)
                .ok_or_else(|| orphan("Invitation", &invitation.manuscript_id))?
                .invitations
                .push(invitation);
        }
        for assignment in snapshot.assignments {
            parts
                .get_mut(&assignment.manuscript_id)
                .ok_or_else(|| orphan("Assignment", &assignment.manuscript_id))?
                .assignments
                .push(assignment);
        }
        for decision in snapshot.decisions {
            parts
                .get_mut(&decision.manuscript_id)
                .ok_or_else(|| orphan("Decision", &decision.manuscript_id))?
                .decisions
                .push(decision);
        }
        for record in snapshot.correspondence {
            parts
                .get_mut(&record.manuscript_id)
                .ok_or_else(|| orphan("Correspondence", &record.manuscript_id))?
                .correspondence
                .push(record);
        }

        let mut directory = RoleDirectory::new();
        for user in snapshot.users {
            directory.restore_user(user);
        }
        let journals: HashMap<_, _> = snapshot
            .journals
            .into_iter()
            .map(|j| (j.id, j))
            .collect();

        let mut index = DeskIndex::default();
        for manuscript in snapshot.manuscripts {
            let id = manuscript.id;
            let part = parts.remove(&id).unwrap_or_default();
            for invitation in &part.invitations {
                index.tokens.insert(invitation.token.clone(), id);
            }
            for assignment in &part.assignments {
                index.assignments.insert(assignment.id, id);
            }
            for record in &part.correspondence {
                index.records.insert(record.id, id);
            }
            let desk = ManuscriptDesk {
                manuscript,
                invitations: InvitationLedger::from_invitations(part.invitations),
                assignments: AssignmentTracker::from_assignments(part.assignments),
                decisions: DecisionLog::from_decisions(part.decisions),
                correspondence: CorrespondenceLog::from_records(part.correspondence),
            };
            index.desks.insert(id, DeskEntry::new(desk));
        }

        let manuscripts = index.desks.len();
        let users = directory.count();
        *self.write_directory()? = directory;
        *self.write_journals()? = journals;
        *self.write_index()? = index;
        *self.lock_events()? = InMemoryEventStore::from_events(snapshot.events);
        tracing::info!(users, manuscripts, "Office state restored");
        Ok(())
    }
}
