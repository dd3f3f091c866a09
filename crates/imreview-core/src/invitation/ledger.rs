//! Per-manuscript ledger of reviewer invitations

use chrono::{DateTime, Duration, Utc};

use super::{Invitation, InvitationStatus, InvitationToken};
use crate::error::{Result, ReviewError};
use crate::id::{AssignmentId, JournalId, ManuscriptId, UserId};
use crate::role::normalize_email;

/// Everything needed to issue an invitation
#[derive(Debug, Clone)]
pub struct InvitationRequest {
    pub manuscript_id: ManuscriptId,
    pub journal_id: JournalId,
    pub reviewer_email: String,
    pub invited_by: UserId,
    pub message: Option<String>,
    pub window_days: u32,
}

/// Invitations for one manuscript, in issue order
///
/// Resolution is a check-and-set on a `&mut` borrow, so callers holding the
/// manuscript lock get single-use semantics for free.
#[derive(Debug, Clone, Default)]
pub struct InvitationLedger {
    invitations: Vec<Invitation>,
}

impl InvitationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted invitations
    pub fn from_invitations(invitations: Vec<Invitation>) -> Self {
        Self { invitations }
    }

    pub fn all(&self) -> &[Invitation] {
        &self.invitations
    }

    pub fn len(&self) -> usize {
        self.invitations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invitations.is_empty()
    }

    pub fn get(&self, token: &InvitationToken) -> Option<&Invitation> {
        self.invitations.iter().find(|i| i.token == *token)
    }

    /// The open invitation for `email`, if any
    pub fn open_for(&self, email: &str, now: DateTime<Utc>) -> Option<&Invitation> {
        let email = normalize_email(email);
        self.invitations
            .iter()
            .find(|i| i.reviewer_email == email && i.is_open(now))
    }

    /// Record a new pending invitation
    pub fn issue(&mut self, request: InvitationRequest, now: DateTime<Utc>) -> &Invitation {
        let index = self.invitations.len();
        self.invitations.push(Invitation {
            token: InvitationToken::generate(),
            manuscript_id: request.manuscript_id,
            journal_id: request.journal_id,
            reviewer_email: normalize_email(&request.reviewer_email),
            invited_by: request.invited_by,
            message: request.message,
            issued_at: now,
            expires_at: now + Duration::days(i64::from(request.window_days)),
            status: InvitationStatus::Pending,
            responded_at: None,
            decline_reason: None,
            assignment_id: None,
        });
        &self.invitations[index]
    }

    /// Materialize lazy expiry, returning the tokens that just expired
    pub fn expire_overdue(&mut self, now: DateTime<Utc>) -> Vec<InvitationToken> {
        let mut expired = Vec::new();
        for invitation in &mut self.invitations {
            if invitation.status == InvitationStatus::Pending && now > invitation.expires_at {
                invitation.status = InvitationStatus::Expired;
                expired.push(invitation.token.clone());
            }
        }
        expired
    }

    /// The invitation behind `token`, provided it can still be resolved
    pub fn pending(&self, token: &InvitationToken, now: DateTime<Utc>) -> Result<&Invitation> {
        let invitation = self
            .get(token)
            .ok_or_else(|| ReviewError::NotFound(format!("Invitation {}", token)))?;
        match invitation.status_at(now) {
            InvitationStatus::Pending => Ok(invitation),
            InvitationStatus::Expired => Err(ReviewError::Expired(token.to_string())),
            status => Err(ReviewError::AlreadyResolved {
                entity: "Invitation".to_string(),
                id: token.to_string(),
                status: status.to_string(),
            }),
        }
    }

    fn claim(&mut self, token: &InvitationToken, now: DateTime<Utc>) -> Result<&mut Invitation> {
        self.pending(token, now)?;
        self.invitations
            .iter_mut()
            .find(|i| i.token == *token)
            .ok_or_else(|| ReviewError::NotFound(format!("Invitation {}", token)))
    }

    /// Resolve as accepted, linking the assignment it produced
    pub fn accept(
        &mut self,
        token: &InvitationToken,
        assignment_id: AssignmentId,
        now: DateTime<Utc>,
    ) -> Result<&Invitation> {
        let invitation = self.claim(token, now)?;
        invitation.status = InvitationStatus::Accepted;
        invitation.responded_at = Some(now);
        invitation.assignment_id = Some(assignment_id);
        Ok(invitation)
    }

    /// Resolve as declined
    pub fn decline(
        &mut self,
        token: &InvitationToken,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Invitation> {
        let invitation = self.claim(token, now)?;
        invitation.status = InvitationStatus::Declined;
        invitation.responded_at = Some(now);
        invitation.decline_reason = reason.filter(|r| !r.trim().is_empty());
        Ok(invitation)
    }
}
