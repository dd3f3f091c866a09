//! Users, role grants and authorization

mod context;
mod directory;
mod operation;
mod types;
mod user;

pub use context::RequestContext;
pub use directory::RoleDirectory;
pub use operation::Operation;
pub use types::{GrantStatus, Role, RoleDecision, RoleGrant, RoleSet};
pub use user::{normalize_email, User};
