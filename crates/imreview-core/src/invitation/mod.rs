//! Reviewer invitations and their single-use tokens

mod invitation;
mod ledger;

pub use invitation::{AcceptOutcome, Invitation, InvitationStatus, InvitationToken};
pub use ledger::{InvitationLedger, InvitationRequest};
