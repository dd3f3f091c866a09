//! Request-scoped caller context

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// The authenticated caller of one engine operation
///
/// Identity is established by the external auth provider; the engine only
/// consumes "who is this user" and checks roles against the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: UserId,
    /// Correlates audit events produced by the same request
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}
