//! Accounts, role grants and journals

use super::EditorialOffice;
use crate::error::{Result, ReviewError};
use crate::event::{EntityType, Event, EventPayload};
use crate::id::{GrantId, JournalId, UserId};
use crate::journal::Journal;
use crate::role::{Operation, RequestContext, Role, RoleDecision, RoleGrant, User};

impl EditorialOffice {
    // ==================== Accounts ====================

    /// Sign up; the new user holds an approved author role
    pub fn register_user(&self, email: &str, display_name: &str) -> Result<User> {
        let now = self.now();
        let user = self
            .write_directory()?
            .register_user(email, display_name, now)?
            .clone();
        self.record(
            None,
            vec![Event::new(
                user.id,
                EntityType::User,
                EventPayload::UserRegistered {
                    email: user.email.clone(),
                },
                now,
            )
            .with_actor(user.id)],
        )?;
        Ok(user)
    }

    /// Seed an administrator; used when bootstrapping an installation
    pub fn bootstrap_admin(&self, email: &str, display_name: &str) -> Result<User> {
        let now = self.now();
        let user = self
            .write_directory()?
            .bootstrap_admin(email, display_name, now)?
            .clone();
        self.record(
            None,
            vec![Event::new(
                user.id,
                EntityType::User,
                EventPayload::UserRegistered {
                    email: user.email.clone(),
                },
                now,
            )],
        )?;
        Ok(user)
    }

    /// The caller's own account
    pub fn me(&self, ctx: &RequestContext) -> Result<User> {
        let directory = self.read_directory()?;
        let user = directory.user(&ctx.user_id)?;
        if !user.is_active() {
            return Err(ReviewError::unauthorized(
                ctx.user_id,
                "view account",
                "account is deactivated",
            ));
        }
        Ok(user.clone())
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.read_directory()?.find_by_email(email).cloned())
    }

    /// All accounts, for administrators
    pub fn users(&self, ctx: &RequestContext) -> Result<Vec<User>> {
        let directory = self.read_directory()?;
        directory.authorize(ctx, Operation::ManageUsers, None)?;
        let mut users: Vec<User> = directory.all().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    pub fn deactivate_user(&self, ctx: &RequestContext, user_id: &UserId) -> Result<User> {
        let now = self.now();
        let user = self
            .write_directory()?
            .deactivate_user(ctx, user_id, now)?
            .clone();
        self.record(
            Some(ctx),
            vec![Event::new(
                user.id,
                EntityType::User,
                EventPayload::UserDeactivated,
                now,
            )],
        )?;
        Ok(user)
    }

    // ==================== Roles ====================

    /// Ask for an additional role on behalf of the caller
    pub fn request_role(
        &self,
        ctx: &RequestContext,
        role: Role,
        journal: Option<JournalId>,
        reason: Option<String>,
    ) -> Result<RoleGrant> {
        if let Some(journal_id) = journal {
            self.journal(&journal_id)?;
        }
        let now = self.now();
        let grant = self
            .write_directory()?
            .request_role(&ctx.user_id, role, journal, reason, now)?
            .clone();
        self.record(
            Some(ctx),
            vec![Event::new(
                grant.user_id,
                EntityType::User,
                EventPayload::RoleRequested {
                    grant_id: grant.id.to_string(),
                    role,
                },
                now,
            )],
        )?;
        Ok(grant)
    }

    /// Approve or reject a pending role request
    pub fn decide_role_request(
        &self,
        ctx: &RequestContext,
        grant_id: &GrantId,
        decision: RoleDecision,
        notes: Option<String>,
    ) -> Result<RoleGrant> {
        let now = self.now();
        let grant = self
            .write_directory()?
            .decide_role_request(ctx, grant_id, decision, notes, now)?
            .clone();
        self.record(
            Some(ctx),
            vec![Event::new(
                grant.user_id,
                EntityType::User,
                EventPayload::RoleDecided {
                    grant_id: grant.id.to_string(),
                    role: grant.role,
                    approved: grant.is_approved(),
                },
                now,
            )],
        )?;
        Ok(grant)
    }

    /// Pending role requests, oldest first
    pub fn pending_role_requests(&self, ctx: &RequestContext) -> Result<Vec<RoleGrant>> {
        let directory = self.read_directory()?;
        directory.authorize(ctx, Operation::DecideRoleRequest, None)?;
        Ok(directory.pending_requests().into_iter().cloned().collect())
    }

    /// Change the persona the caller operates as
    pub fn switch_active_role(&self, ctx: &RequestContext, role: Role) -> Result<User> {
        let now = self.now();
        let mut directory = self.write_directory()?;
        let before = directory.user(&ctx.user_id)?.active_role;
        let user = directory.switch_active_role(&ctx.user_id, role, now)?.clone();
        drop(directory);

        if before != role {
            self.record(
                Some(ctx),
                vec![Event::new(
                    user.id,
                    EntityType::User,
                    EventPayload::ActiveRoleSwitched { role },
                    now,
                )],
            )?;
        }
        Ok(user)
    }

    // ==================== Journals ====================

    pub fn create_journal(
        &self,
        ctx: &RequestContext,
        name: &str,
        abbreviation: &str,
    ) -> Result<Journal> {
        self.read_directory()?
            .authorize(ctx, Operation::ManageJournals, None)?;
        let now = self.now();
        let journal = Journal::new(name, abbreviation, now)?;
        self.write_journals()?.insert(journal.id, journal.clone());
        tracing::info!(journal_id = %journal.id, name = %journal.name, "Journal created");
        self.record(
            Some(ctx),
            vec![Event::new(
                journal.id,
                EntityType::Journal,
                EventPayload::JournalCreated {
                    name: journal.name.clone(),
                },
                now,
            )],
        )?;
        Ok(journal)
    }

    pub fn journal(&self, id: &JournalId) -> Result<Journal> {
        self.read_journals()?
            .get(id)
            .cloned()
            .ok_or_else(|| ReviewError::NotFound(format!("Journal {}", id)))
    }

    pub fn journals(&self) -> Result<Vec<Journal>> {
        let mut journals: Vec<Journal> = self.read_journals()?.values().cloned().collect();
        journals.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(journals)
    }
}
