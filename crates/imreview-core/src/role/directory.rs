//! Role directory: who holds which roles, and which persona is active

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::user::normalize_email;
use super::{GrantStatus, Operation, RequestContext, Role, RoleDecision, RoleGrant, User};
use crate::error::{Result, ReviewError, Validator};
use crate::id::{GrantId, JournalId, UserId};

/// Registry of users and their role grants
#[derive(Debug, Default)]
pub struct RoleDirectory {
    users: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
    grant_owner: HashMap<GrantId, UserId>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Accounts ====================

    /// Sign up a new user; the author role is granted and active
    pub fn register_user(
        &mut self,
        email: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<&User> {
        let normalized = normalize_email(email);
        Validator::new()
            .check(
                normalized.contains('@') && normalized.len() > 2,
                "email",
                "must be a valid email address",
            )
            .check(
                !self.by_email.contains_key(&normalized),
                "email",
                "is already registered",
            )
            .require_text(display_name, "display_name")
            .finish()?;

        let user = User::new(&normalized, display_name, now);
        tracing::info!(user_id = %user.id, email = %user.email, "User registered");
        Ok(self.insert(user))
    }

    /// Create an administrator account for seeding a fresh installation
    pub fn bootstrap_admin(
        &mut self,
        email: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<&User> {
        let id = self.register_user(email, display_name, now)?.id;
        let grant = RoleGrant::system_approved(id, Role::Admin, None, now);
        self.grant_owner.insert(grant.id, id);
        let user = self.user_mut(&id)?;
        user.grants.push(grant);
        user.active_role = Role::Admin;
        tracing::info!(user_id = %id, "Bootstrap administrator created");
        self.user(&id)
    }

    /// Insert a user as-is (used when restoring persisted state)
    pub fn restore_user(&mut self, user: User) {
        self.insert(user);
    }

    fn insert(&mut self, user: User) -> &User {
        let id = user.id;
        self.by_email.insert(user.email.clone(), id);
        for grant in &user.grants {
            self.grant_owner.insert(grant.id, id);
        }
        self.users.entry(id).or_insert(user)
    }

    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn user(&self, id: &UserId) -> Result<&User> {
        self.users
            .get(id)
            .ok_or_else(|| ReviewError::NotFound(format!("User {}", id)))
    }

    fn user_mut(&mut self, id: &UserId) -> Result<&mut User> {
        self.users
            .get_mut(id)
            .ok_or_else(|| ReviewError::NotFound(format!("User {}", id)))
    }

    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        self.by_email
            .get(&normalize_email(email))
            .and_then(|id| self.users.get(id))
    }

    pub fn all(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }

    /// Deactivate an account; users are never deleted
    pub fn deactivate_user(
        &mut self,
        ctx: &RequestContext,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<&User> {
        self.authorize(ctx, Operation::ManageUsers, None)?;
        let user = self.user_mut(user_id)?;
        if !user.deactivated {
            user.deactivated = true;
            user.updated_at = now;
            tracing::info!(user_id = %user_id, by = %ctx.user_id, "User deactivated");
        }
        self.user(user_id)
    }

    // ==================== Grants ====================

    pub fn grant(&self, id: &GrantId) -> Option<&RoleGrant> {
        let owner = self.grant_owner.get(id)?;
        self.users
            .get(owner)
            .and_then(|u| u.grants.iter().find(|g| g.id == *id))
    }

    /// Pending role requests across all users, oldest first
    pub fn pending_requests(&self) -> Vec<&RoleGrant> {
        let mut pending: Vec<_> = self
            .users
            .values()
            .flat_map(|u| u.grants.iter())
            .filter(|g| g.status == GrantStatus::Pending)
            .collect();
        pending.sort_by_key(|g| g.requested_at);
        pending
    }

    /// Ask for a role; an administrator must approve it before it is usable
    pub fn request_role(
        &mut self,
        user_id: &UserId,
        role: Role,
        journal: Option<JournalId>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&RoleGrant> {
        let user = self.user(user_id)?;
        if !user.is_active() {
            return Err(ReviewError::unauthorized(
                user_id,
                "request role",
                "account is deactivated",
            ));
        }
        if user.open_grant(role).is_some() {
            return Err(ReviewError::DuplicateRequest {
                user: user_id.to_string(),
                role: role.to_string(),
            });
        }

        let grant = RoleGrant::requested(*user_id, role, journal, reason, now);
        let grant_id = grant.id;
        self.grant_owner.insert(grant_id, *user_id);
        let user = self.user_mut(user_id)?;
        user.grants.push(grant);
        user.updated_at = now;
        tracing::info!(user_id = %user_id, role = %role, grant_id = %grant_id, "Role requested");

        self.grant(&grant_id)
            .ok_or_else(|| ReviewError::NotFound(format!("Grant {}", grant_id)))
    }

    /// Approve or reject a pending request; approval never auto-activates
    pub fn decide_role_request(
        &mut self,
        ctx: &RequestContext,
        grant_id: &GrantId,
        decision: RoleDecision,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&RoleGrant> {
        self.authorize(ctx, Operation::DecideRoleRequest, None)?;

        let owner = *self
            .grant_owner
            .get(grant_id)
            .ok_or_else(|| ReviewError::NotFound(format!("Grant {}", grant_id)))?;
        let user = self.user_mut(&owner)?;
        let grant = user
            .grants
            .iter_mut()
            .find(|g| g.id == *grant_id)
            .ok_or_else(|| ReviewError::NotFound(format!("Grant {}", grant_id)))?;

        if grant.status != GrantStatus::Pending {
            return Err(ReviewError::AlreadyResolved {
                entity: "Role request".to_string(),
                id: grant_id.to_string(),
                status: grant.status.to_string(),
            });
        }

        grant.status = match decision {
            RoleDecision::Approve => GrantStatus::Approved,
            RoleDecision::Reject => GrantStatus::Rejected,
        };
        grant.decided_at = Some(now);
        grant.decided_by = Some(ctx.user_id);
        grant.notes = notes;
        user.updated_at = now;
        tracing::info!(
            grant_id = %grant_id,
            user_id = %owner,
            decision = ?decision,
            by = %ctx.user_id,
            "Role request decided"
        );

        self.grant(grant_id)
            .ok_or_else(|| ReviewError::NotFound(format!("Grant {}", grant_id)))
    }

    /// Make sure the user can review for `journal`
    ///
    /// Accepting a review invitation grants the reviewer role for the
    /// inviting journal only. Pending requests are left for an admin to
    /// decide, and a rejected request covering the journal is not
    /// overridden. Returns `true` when a grant was issued.
    pub fn ensure_reviewer_grant(
        &mut self,
        user_id: &UserId,
        journal: JournalId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let user = self.user_mut(user_id)?;
        if user.holds_for(Role::Reviewer, Some(&journal)) {
            return Ok(false);
        }
        let rejected = user.grants.iter().any(|g| {
            g.role == Role::Reviewer
                && g.status == GrantStatus::Rejected
                && g.covers(Some(&journal))
        });
        if rejected {
            return Err(ReviewError::RoleNotApproved {
                user: user_id.to_string(),
                role: Role::Reviewer.to_string(),
            });
        }

        let grant = RoleGrant::system_approved(*user_id, Role::Reviewer, Some(journal), now);
        let grant_id = grant.id;
        user.grants.push(grant);
        user.updated_at = now;
        self.grant_owner.insert(grant_id, *user_id);
        Ok(true)
    }

    // ==================== Personas ====================

    /// Switch the persona the user operates as; idempotent
    pub fn switch_active_role(
        &mut self,
        user_id: &UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<&User> {
        let user = self.user_mut(user_id)?;
        if !user.holds(role) {
            return Err(ReviewError::RoleNotApproved {
                user: user_id.to_string(),
                role: role.to_string(),
            });
        }
        if user.active_role != role {
            tracing::info!(user_id = %user_id, from = %user.active_role, to = %role, "Active role switched");
            user.active_role = role;
            user.updated_at = now;
        }
        self.user(user_id)
    }

    // ==================== Authorization ====================

    /// Check that the caller's active persona may perform `operation`
    ///
    /// For journal-scoped operations an approved grant of the active role
    /// must cover `journal`.
    pub fn authorize(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        journal: Option<&JournalId>,
    ) -> Result<&User> {
        let user = self
            .users
            .get(&ctx.user_id)
            .ok_or_else(|| ReviewError::unauthorized(ctx.user_id, operation, "unknown user"))?;

        if !user.is_active() {
            return Err(ReviewError::unauthorized(
                user.id,
                operation,
                "account is deactivated",
            ));
        }

        let role = user.active_role;
        let required = operation.required_roles();
        if !required.allows(role) {
            return Err(ReviewError::unauthorized(
                user.id,
                operation,
                format!("active role {} is not one of {}", role, required),
            ));
        }

        let scope = if operation.is_journal_scoped() {
            journal
        } else {
            None
        };
        if !user.holds_for(role, scope) {
            return Err(ReviewError::unauthorized(
                user.id,
                operation,
                format!("{} grant does not cover this journal", role),
            ));
        }

        Ok(user)
    }
}
