//! Imreview Core - Manuscript lifecycle and peer-review engine
//!
//! This crate provides the authoritative engine behind an academic journal's
//! submission and review workflow:
//!
//! - **Role**: Users, role grants (author, reviewer, editor, admin), active persona and authorization
//! - **Manuscript**: Submission and the status state machine (Submitted→UnderReview→Accepted→Published)
//! - **Invitation**: Single-use reviewer invitation tokens with lazy expiry
//! - **Assignment**: Review assignments, drafts, submissions and the review tally
//! - **Decision**: Editorial decisions and publication
//! - **Correspondence**: Append-only message log with best-effort delivery
//! - **Event**: Immutable audit trail of every mutation
//! - **Office**: The service composing all of the above under per-manuscript locks
//! - **Persistence**: SQLite-based storage of office snapshots (feature `sqlite`)
//! - **Config**: Windows, deadlines and workflow switches
//!
//! # Lifecycle
//!
//! ```text
//! submitted → under_review → correction → resubmitted → under_review
//!                          → accepted → under_publication → published
//!                          → rejected
//! ```
//!
//! Expiry is never driven by timers. Invitations and overdue reviews are
//! expired lazily whenever the manuscript they belong to is read.

pub mod assignment;
pub mod clock;
pub mod config;
pub mod correspondence;
pub mod decision;
pub mod error;
pub mod event;
pub mod id;
pub mod invitation;
pub mod journal;
pub mod mailer;
pub mod manuscript;
pub mod office;
pub mod persistence;
pub mod role;

pub use assignment::{
    AssignmentStatus, Ratings, Recommendation, ReviewAssignment, ReviewDraft, ReviewTally,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ReviewConfig;
pub use correspondence::{CorrespondenceRecord, DeliveryStatus, NewCorrespondence};
pub use decision::{Decision, DecisionPayload, DecisionType, PublicationRequest};
pub use error::{ErrorKind, FieldError, Result, ReviewError};
pub use event::{Event, EventPayload, EventStore};
pub use id::{AssignmentId, DecisionId, GrantId, JournalId, ManuscriptId, RecordId, UserId};
pub use invitation::{AcceptOutcome, Invitation, InvitationStatus, InvitationToken};
pub use journal::Journal;
pub use mailer::{LogMailer, Mailer, OutgoingMail, RecordingMailer};
pub use manuscript::{
    FileRef, Manuscript, ManuscriptEvent, ManuscriptStatus, NewManuscript, RevisionSeverity,
};
pub use office::{EditorialOffice, InviteRequest, OfficeSnapshot};
pub use persistence::{Repository, Schema};
pub use role::{Operation, RequestContext, Role, RoleDecision, RoleGrant, User};

/// Returns the version of imreview-core
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
