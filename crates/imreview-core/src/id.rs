//! Identifier newtypes
//!
//! Each entity gets its own UUID wrapper so ids cannot be mixed up across
//! entity kinds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FieldError, ReviewError};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse an id from its string form
            pub fn parse(s: &str) -> crate::error::Result<Self> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
                    ReviewError::Validation(vec![FieldError::new($label, e.to_string())])
                })
            }

            /// First eight hex digits, for human-facing labels
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ReviewError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

uuid_id!(
    /// Identifies a user account
    UserId,
    "user_id"
);
uuid_id!(
    /// Identifies a role grant or role request
    GrantId,
    "grant_id"
);
uuid_id!(
    /// Identifies a journal
    JournalId,
    "journal_id"
);
uuid_id!(
    /// Identifies a manuscript across all of its versions
    ManuscriptId,
    "manuscript_id"
);
uuid_id!(
    /// Identifies a review assignment
    AssignmentId,
    "assignment_id"
);
uuid_id!(
    /// Identifies an editorial decision
    DecisionId,
    "decision_id"
);
uuid_id!(
    /// Identifies a correspondence record
    RecordId,
    "record_id"
);
