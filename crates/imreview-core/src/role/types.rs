//! Roles, role sets and role grants

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{GrantId, JournalId, UserId};

/// A persona a user can operate as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Author,
    Reviewer,
    Editor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Author, Role::Reviewer, Role::Editor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Reviewer => "reviewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "author" => Some(Role::Author),
            "reviewer" => Some(Role::Reviewer),
            "editor" => Some(Role::Editor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// The single-role mask for this role
    pub fn as_set(&self) -> RoleSet {
        match self {
            Role::Author => RoleSet::AUTHOR,
            Role::Reviewer => RoleSet::REVIEWER,
            Role::Editor => RoleSet::EDITOR,
            Role::Admin => RoleSet::ADMIN,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Set of roles permitted to perform an operation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RoleSet: u8 {
        const AUTHOR = 0b0001;
        const REVIEWER = 0b0010;
        const EDITOR = 0b0100;
        const ADMIN = 0b1000;
    }
}

impl RoleSet {
    /// Editors and administrators
    pub const EDITORIAL: RoleSet = RoleSet::EDITOR.union(RoleSet::ADMIN);

    /// Anyone who may correspond about a manuscript
    pub const CORRESPONDENTS: RoleSet = RoleSet::AUTHOR.union(RoleSet::EDITORIAL);

    #[inline]
    pub fn allows(&self, role: Role) -> bool {
        self.contains(role.as_set())
    }

    /// Roles in this set, in declaration order
    pub fn roles(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|r| self.allows(*r)).collect()
    }
}

impl std::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.roles().iter().map(|r| r.as_str()).collect();
        f.write_str(&names.join("|"))
    }
}

/// Approval status of a role grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantStatus::Pending => write!(f, "pending"),
            GrantStatus::Approved => write!(f, "approved"),
            GrantStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// An administrator's ruling on a role request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDecision {
    Approve,
    Reject,
}

/// A role held or requested by a user, optionally scoped to one journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub id: GrantId,
    pub user_id: UserId,
    pub role: Role,
    pub status: GrantStatus,
    /// `None` means the grant applies to every journal
    pub journal: Option<JournalId>,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    /// `None` for grants issued by the system (signup, invitation acceptance)
    pub decided_by: Option<UserId>,
    pub notes: Option<String>,
}

impl RoleGrant {
    /// A pending request awaiting an administrator
    pub fn requested(
        user_id: UserId,
        role: Role,
        journal: Option<JournalId>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GrantId::new(),
            user_id,
            role,
            status: GrantStatus::Pending,
            journal,
            reason,
            requested_at: now,
            decided_at: None,
            decided_by: None,
            notes: None,
        }
    }

    /// A grant issued directly by the system
    pub fn system_approved(
        user_id: UserId,
        role: Role,
        journal: Option<JournalId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: GrantStatus::Approved,
            decided_at: Some(now),
            ..Self::requested(user_id, role, journal, None, now)
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == GrantStatus::Approved
    }

    /// Whether this grant applies to `journal`
    ///
    /// Global grants cover every journal; scoped grants cover only their own.
    /// Operations without a journal context are covered by any grant.
    pub fn covers(&self, journal: Option<&JournalId>) -> bool {
        match (&self.journal, journal) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(scope), Some(target)) => scope == target,
        }
    }
}
