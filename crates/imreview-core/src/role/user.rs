//! User accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GrantStatus, Role, RoleGrant};
use crate::id::{JournalId, UserId};

/// Canonical form of an email address used for lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A registered user and the roles they hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub grants: Vec<RoleGrant>,
    /// The persona the user is currently operating as; always approved
    pub active_role: Role,
    pub deactivated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a user with the implicit approved author grant
    pub fn new(email: &str, display_name: &str, now: DateTime<Utc>) -> Self {
        let id = UserId::new();
        Self {
            id,
            email: normalize_email(email),
            display_name: display_name.trim().to_string(),
            grants: vec![RoleGrant::system_approved(id, Role::Author, None, now)],
            active_role: Role::Author,
            deactivated: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the user holds any approved grant for `role`
    pub fn holds(&self, role: Role) -> bool {
        self.grants.iter().any(|g| g.role == role && g.is_approved())
    }

    /// Whether an approved grant for `role` covers `journal`
    pub fn holds_for(&self, role: Role, journal: Option<&JournalId>) -> bool {
        self.grants
            .iter()
            .any(|g| g.role == role && g.is_approved() && g.covers(journal))
    }

    /// A pending or approved grant for `role`, if any
    pub fn open_grant(&self, role: Role) -> Option<&RoleGrant> {
        self.grants
            .iter()
            .find(|g| g.role == role && g.status != GrantStatus::Rejected)
    }

    pub fn is_active(&self) -> bool {
        !self.deactivated
    }
}
