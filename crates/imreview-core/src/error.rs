//! Error types for imreview-core

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for imreview operations
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Main error type for imreview operations
///
/// Every operation of the engine fails with one of these tagged kinds; the
/// calling layer maps [`ErrorKind`] to a stable response code.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Event not valid from the entity's current status
    #[error("Invalid transition: {event} is not allowed for {entity} in status {from}")]
    InvalidTransition {
        entity: String,
        from: String,
        event: String,
    },

    /// Invitation or token is past its window
    #[error("Invitation {0} has expired")]
    Expired(String),

    /// Single-use resource was already resolved
    #[error("{entity} {id} is already resolved ({status})")]
    AlreadyResolved {
        entity: String,
        id: String,
        status: String,
    },

    /// Review was already submitted
    #[error("Review for assignment {0} has already been submitted")]
    AlreadySubmitted(String),

    /// Reviewer already has an open invitation or active assignment
    #[error("Reviewer {reviewer} already has an active invitation or assignment for manuscript {manuscript}")]
    AlreadyAssigned { reviewer: String, manuscript: String },

    /// Role request duplicates a non-rejected grant
    #[error("User {user} already holds a {role} grant that is not rejected")]
    DuplicateRequest { user: String, role: String },

    /// Role is not approved for this user
    #[error("User {user} does not hold an approved {role} role")]
    RoleNotApproved { user: String, role: String },

    /// Caller may not perform this operation
    #[error("User {user} is not authorized to {operation}: {reason}")]
    Unauthorized {
        user: String,
        operation: String,
        reason: String,
    },

    /// Malformed payload, with field-level detail
    #[error("Validation failed: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// Manuscript is not ready for the requested decision
    #[error("Manuscript {manuscript} is not ready for a decision ({completed} of {required} reviews completed)")]
    NotReady {
        manuscript: String,
        completed: usize,
        required: usize,
    },

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency check failed
    #[error("Conflict on {entity} {id}: expected version {expected}, found {actual}")]
    Conflict {
        entity: String,
        id: String,
        expected: u64,
        actual: u64,
    },

    /// Persistence-related errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Internal failure such as a poisoned lock
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects field errors while validating a payload
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field` unless `ok` holds
    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Require a non-blank string
    pub fn require_text(&mut self, value: &str, field: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, "must not be empty")
    }

    pub fn push(&mut self, error: FieldError) -> &mut Self {
        self.errors.push(error);
        self
    }

    /// Finish validation, failing if any errors were recorded
    pub fn finish(&mut self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ReviewError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// Stable classification of [`ReviewError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidTransition,
    Expired,
    AlreadyResolved,
    AlreadySubmitted,
    AlreadyAssigned,
    DuplicateRequest,
    RoleNotApproved,
    Unauthorized,
    Validation,
    NotReady,
    NotFound,
    Conflict,
    Persistence,
    Config,
    Internal,
}

impl ErrorKind {
    /// Machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Expired => "expired",
            ErrorKind::AlreadyResolved => "already_resolved",
            ErrorKind::AlreadySubmitted => "already_submitted",
            ErrorKind::AlreadyAssigned => "already_assigned",
            ErrorKind::DuplicateRequest => "duplicate_request",
            ErrorKind::RoleNotApproved => "role_not_approved",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotReady => "not_ready",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Persistence => "persistence_error",
            ErrorKind::Config => "config_error",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// Idempotency guards: callers treat these as "no-op, refresh view"
    pub fn is_idempotency_guard(&self) -> bool {
        matches!(
            self,
            ErrorKind::AlreadyResolved | ErrorKind::AlreadySubmitted | ErrorKind::AlreadyAssigned
        )
    }

    /// Permission failures are always surfaced and never retried
    pub fn is_permission_failure(&self) -> bool {
        matches!(self, ErrorKind::RoleNotApproved | ErrorKind::Unauthorized)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl ReviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            ReviewError::Expired(_) => ErrorKind::Expired,
            ReviewError::AlreadyResolved { .. } => ErrorKind::AlreadyResolved,
            ReviewError::AlreadySubmitted(_) => ErrorKind::AlreadySubmitted,
            ReviewError::AlreadyAssigned { .. } => ErrorKind::AlreadyAssigned,
            ReviewError::DuplicateRequest { .. } => ErrorKind::DuplicateRequest,
            ReviewError::RoleNotApproved { .. } => ErrorKind::RoleNotApproved,
            ReviewError::Unauthorized { .. } => ErrorKind::Unauthorized,
            ReviewError::Validation(_) => ErrorKind::Validation,
            ReviewError::NotReady { .. } => ErrorKind::NotReady,
            ReviewError::NotFound(_) => ErrorKind::NotFound,
            ReviewError::Conflict { .. } => ErrorKind::Conflict,
            ReviewError::Persistence(_) => ErrorKind::Persistence,
            ReviewError::Config(_) => ErrorKind::Config,
            ReviewError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Field errors carried by a validation failure
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ReviewError::Validation(errors) => errors,
            _ => &[],
        }
    }

    pub(crate) fn invalid_transition(
        entity: &str,
        from: impl fmt::Display,
        event: impl fmt::Display,
    ) -> Self {
        ReviewError::InvalidTransition {
            entity: entity.to_string(),
            from: from.to_string(),
            event: event.to_string(),
        }
    }

    pub(crate) fn unauthorized(
        user: impl fmt::Display,
        operation: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        ReviewError::Unauthorized {
            user: user.to_string(),
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        ReviewError::Internal(format!("{} lock poisoned", what))
    }
}

/// Persistence-specific errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },
}

/// Configuration errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Values are inconsistent with each other
    #[error("Inconsistent values: {0}")]
    Inconsistent(String),

    /// Config file could not be parsed
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(String),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for ReviewError {
    fn from(err: rusqlite::Error) -> Self {
        ReviewError::Persistence(PersistenceError::Database(err.to_string()))
    }
}

impl From<serde_json::Error> for ReviewError {
    fn from(err: serde_json::Error) -> Self {
        ReviewError::Persistence(PersistenceError::Serialization(err.to_string()))
    }
}
