//! The editorial office: one authoritative service over every module
//!
//! Every operation takes the caller's [`RequestContext`], authorizes it
//! against the role directory, mutates state, and appends audit events.
//!
//! Locking: the role directory has its own lock, the index maps are
//! read-mostly, and each manuscript's state lives in a [`ManuscriptDesk`]
//! behind its own mutex. Locks are always taken in the order directory,
//! index, desk, event store. Index guards are never held while waiting on
//! another lock, so desk holders may update the index.

mod desk;
mod editorial;
mod manuscripts;
mod people;
mod reviews;
mod snapshot;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::config::ReviewConfig;
use crate::error::{Result, ReviewError};
use crate::event::{EntityType, Event, EventPayload, EventStore, InMemoryEventStore};
use crate::id::{AssignmentId, JournalId, ManuscriptId, RecordId};
use crate::invitation::InvitationToken;
use crate::journal::Journal;
use crate::mailer::{LogMailer, Mailer};
use crate::manuscript::{Manuscript, StatusChange};
use crate::role::{Operation, RequestContext, RoleDirectory};

pub use desk::ManuscriptDesk;
pub use reviews::InviteRequest;
pub use snapshot::OfficeSnapshot;

use desk::DeskEntry;

/// Lookup tables from secondary ids to the manuscript that owns them
#[derive(Debug, Default)]
struct DeskIndex {
    desks: HashMap<ManuscriptId, DeskEntry>,
    tokens: HashMap<InvitationToken, ManuscriptId>,
    assignments: HashMap<AssignmentId, ManuscriptId>,
    records: HashMap<RecordId, ManuscriptId>,
}

/// The manuscript lifecycle and peer-review engine
pub struct EditorialOffice {
    config: ReviewConfig,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn Mailer>,
    directory: RwLock<RoleDirectory>,
    journals: RwLock<HashMap<JournalId, Journal>>,
    index: RwLock<DeskIndex>,
    events: Mutex<InMemoryEventStore>,
}

impl std::fmt::Debug for EditorialOffice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorialOffice")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("mailer", &self.mailer)
            .finish_non_exhaustive()
    }
}

impl Default for EditorialOffice {
    fn default() -> Self {
        Self::new(ReviewConfig::default())
    }
}

impl EditorialOffice {
    /// Create an empty office using the system clock and the log mailer
    pub fn new(config: ReviewConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            mailer: Arc::new(LogMailer),
            directory: RwLock::new(RoleDirectory::new()),
            journals: RwLock::new(HashMap::new()),
            index: RwLock::new(DeskIndex::default()),
            events: Mutex::new(InMemoryEventStore::new()),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the mail backend
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ==================== Locks ====================

    fn read_directory(&self) -> Result<RwLockReadGuard<'_, RoleDirectory>> {
        self.directory
            .read()
            .map_err(|_| ReviewError::poisoned("directory"))
    }

    fn write_directory(&self) -> Result<RwLockWriteGuard<'_, RoleDirectory>> {
        self.directory
            .write()
            .map_err(|_| ReviewError::poisoned("directory"))
    }

    fn read_journals(&self) -> Result<RwLockReadGuard<'_, HashMap<JournalId, Journal>>> {
        self.journals
            .read()
            .map_err(|_| ReviewError::poisoned("journals"))
    }

    fn write_journals(&self) -> Result<RwLockWriteGuard<'_, HashMap<JournalId, Journal>>> {
        self.journals
            .write()
            .map_err(|_| ReviewError::poisoned("journals"))
    }

    fn read_index(&self) -> Result<RwLockReadGuard<'_, DeskIndex>> {
        self.index.read().map_err(|_| ReviewError::poisoned("index"))
    }

    fn write_index(&self) -> Result<RwLockWriteGuard<'_, DeskIndex>> {
        self.index.write().map_err(|_| ReviewError::poisoned("index"))
    }

    fn lock_events(&self) -> Result<MutexGuard<'_, InMemoryEventStore>> {
        self.events.lock().map_err(|_| ReviewError::poisoned("event store"))
    }

    /// The desk entry of a manuscript; the index guard is released on return
    fn entry(&self, id: &ManuscriptId) -> Result<DeskEntry> {
        self.read_index()?
            .desks
            .get(id)
            .cloned()
            .ok_or_else(|| ReviewError::NotFound(format!("Manuscript {}", id)))
    }

    fn entry_for_token(&self, token: &InvitationToken) -> Result<DeskEntry> {
        let manuscript_id = self
            .read_index()?
            .tokens
            .get(token)
            .copied()
            .ok_or_else(|| ReviewError::NotFound(format!("Invitation {}", token)))?;
        self.entry(&manuscript_id)
    }

    fn entry_for_assignment(&self, id: &AssignmentId) -> Result<DeskEntry> {
        let manuscript_id = self
            .read_index()?
            .assignments
            .get(id)
            .copied()
            .ok_or_else(|| ReviewError::NotFound(format!("Assignment {}", id)))?;
        self.entry(&manuscript_id)
    }

    fn entry_for_record(&self, id: &RecordId) -> Result<DeskEntry> {
        let manuscript_id = self
            .read_index()?
            .records
            .get(id)
            .copied()
            .ok_or_else(|| ReviewError::NotFound(format!("Correspondence {}", id)))?;
        self.entry(&manuscript_id)
    }

    /// Every desk entry, for cross-manuscript queries
    fn entries(&self) -> Result<Vec<DeskEntry>> {
        Ok(self.read_index()?.desks.values().cloned().collect())
    }

    /// Lock a desk and materialize lazy expiry before anything reads it
    fn open_desk<'a>(&self, entry: &'a DeskEntry) -> Result<MutexGuard<'a, ManuscriptDesk>> {
        let mut desk = entry.lock()?;
        let expired = desk.refresh(self.now(), self.config.review.overdue_expiry_days);
        if !expired.is_empty() {
            self.record_desk(None, &mut desk, expired)?;
        }
        Ok(desk)
    }

    // ==================== Audit ====================

    /// Stamp events with the caller and append them to the store
    fn record(&self, ctx: Option<&RequestContext>, events: Vec<Event>) -> Result<()> {
        let mut store = self.lock_events()?;
        for event in events {
            let event = match ctx {
                Some(ctx) => event
                    .with_actor(ctx.user_id)
                    .with_correlation(ctx.request_id.clone()),
                None => event,
            };
            store.append(event);
        }
        Ok(())
    }

    /// Append events for a change made on a desk
    ///
    /// Anything besides a status transition also bumps the manuscript's row
    /// version, which guards the whole desk in storage.
    fn record_desk(
        &self,
        ctx: Option<&RequestContext>,
        desk: &mut ManuscriptDesk,
        events: Vec<Event>,
    ) -> Result<()> {
        if events
            .iter()
            .any(|event| event.entity_type != EntityType::Manuscript)
        {
            desk.manuscript.touch(self.now());
        }
        self.record(ctx, events)
    }

    /// Audit history of one entity, oldest first
    ///
    /// Open to editorial roles; entity ids are manuscript, user, invitation
    /// token, assignment, decision or correspondence ids.
    pub fn history(&self, ctx: &RequestContext, entity_id: &str) -> Result<Vec<Event>> {
        self.read_directory()?
            .authorize(ctx, Operation::ViewEditorial, None)?;
        Ok(self
            .lock_events()?
            .events_for_entity(entity_id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Number of events recorded so far
    pub fn event_count(&self) -> Result<u64> {
        Ok(self.lock_events()?.current_sequence())
    }
}

/// Shorthand for the status-change event of a manuscript
fn status_event(change: &StatusChange, manuscript: &Manuscript) -> Event {
    Event::new(
        manuscript.id,
        EntityType::Manuscript,
        EventPayload::ManuscriptStatusChanged {
            from: change.from.unwrap_or(change.to),
            to: change.to,
            event: change.event.clone(),
            version: manuscript.version_number,
        },
        change.at,
    )
}
