//! Guarded operations and the roles each one requires

use serde::{Deserialize, Serialize};

use super::RoleSet;

/// An operation that must pass [`RoleDirectory::authorize`](super::RoleDirectory::authorize)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SubmitManuscript,
    ResubmitManuscript,
    WithdrawManuscript,
    SendForReview,
    InviteReviewer,
    AssignReviewer,
    ConductReview,
    RecordDecision,
    ManagePublication,
    ViewEditorial,
    SendCorrespondence,
    DecideRoleRequest,
    ManageUsers,
    ManageJournals,
}

impl Operation {
    /// Roles whose active persona may perform this operation
    pub fn required_roles(&self) -> RoleSet {
        match self {
            Operation::SubmitManuscript
            | Operation::ResubmitManuscript
            | Operation::WithdrawManuscript => RoleSet::AUTHOR,
            Operation::SendForReview
            | Operation::InviteReviewer
            | Operation::AssignReviewer
            | Operation::RecordDecision
            | Operation::ManagePublication
            | Operation::ViewEditorial => RoleSet::EDITORIAL,
            Operation::ConductReview => RoleSet::REVIEWER,
            Operation::SendCorrespondence => RoleSet::CORRESPONDENTS,
            Operation::DecideRoleRequest | Operation::ManageUsers | Operation::ManageJournals => {
                RoleSet::ADMIN
            }
        }
    }

    /// Whether the caller's grant must cover the target journal
    pub fn is_journal_scoped(&self) -> bool {
        matches!(
            self,
            Operation::SendForReview
                | Operation::InviteReviewer
                | Operation::AssignReviewer
                | Operation::RecordDecision
                | Operation::ManagePublication
                | Operation::ViewEditorial
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::SubmitManuscript => "submit manuscript",
            Operation::ResubmitManuscript => "resubmit manuscript",
            Operation::WithdrawManuscript => "withdraw manuscript",
            Operation::SendForReview => "send for review",
            Operation::InviteReviewer => "invite reviewer",
            Operation::AssignReviewer => "assign reviewer",
            Operation::ConductReview => "conduct review",
            Operation::RecordDecision => "record decision",
            Operation::ManagePublication => "manage publication",
            Operation::ViewEditorial => "view editorial records",
            Operation::SendCorrespondence => "send correspondence",
            Operation::DecideRoleRequest => "decide role request",
            Operation::ManageUsers => "manage users",
            Operation::ManageJournals => "manage journals",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    #[test]
    fn test_editorial_operations_are_scoped() {
        assert!(Operation::InviteReviewer.is_journal_scoped());
        assert!(Operation::InviteReviewer.required_roles().allows(Role::Editor));
        assert!(Operation::InviteReviewer.required_roles().allows(Role::Admin));
        assert!(!Operation::InviteReviewer.required_roles().allows(Role::Reviewer));
    }

    #[test]
    fn test_author_operations() {
        assert!(Operation::SubmitManuscript.required_roles().allows(Role::Author));
        assert!(!Operation::SubmitManuscript.is_journal_scoped());
        assert!(!Operation::SubmitManuscript.required_roles().allows(Role::Editor));
    }
}
