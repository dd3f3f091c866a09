//! Audit event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::{AssignmentStatus, Recommendation};
use crate::decision::DecisionType;
use crate::mailer::DeliveryStatus;
use crate::manuscript::ManuscriptStatus;
use crate::role::Role;

/// Unique identifier for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new random event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recorded change to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Sequence number for ordering, assigned by the store
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// ID of the entity this event affects
    pub entity_id: String,
    pub entity_type: EntityType,
    pub payload: EventPayload,
    /// User whose request caused the change; `None` for lazy expiry
    pub actor_id: Option<String>,
    /// Request that produced the event
    pub correlation_id: Option<String>,
}

impl Event {
    /// Create a new event at `timestamp`
    pub fn new(
        entity_id: impl ToString,
        entity_type: EntityType,
        payload: EventPayload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            sequence: 0, // Set by EventStore
            timestamp,
            entity_id: entity_id.to_string(),
            entity_type,
            payload,
            actor_id: None,
            correlation_id: None,
        }
    }

    /// Set the actor ID
    pub fn with_actor(mut self, actor_id: impl ToString) -> Self {
        self.actor_id = Some(actor_id.to_string());
        self
    }

    /// Set the correlation ID
    pub fn with_correlation(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

/// Type of entity an event affects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Journal,
    Manuscript,
    Invitation,
    Assignment,
    Decision,
    Correspondence,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::User => write!(f, "user"),
            EntityType::Journal => write!(f, "journal"),
            EntityType::Manuscript => write!(f, "manuscript"),
            EntityType::Invitation => write!(f, "invitation"),
            EntityType::Assignment => write!(f, "assignment"),
            EntityType::Decision => write!(f, "decision"),
            EntityType::Correspondence => write!(f, "correspondence"),
        }
    }
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // User events
    UserRegistered {
        email: String,
    },
    RoleRequested {
        grant_id: String,
        role: Role,
    },
    RoleDecided {
        grant_id: String,
        role: Role,
        approved: bool,
    },
    ReviewerRoleGranted {
        journal_id: String,
    },
    ActiveRoleSwitched {
        role: Role,
    },
    UserDeactivated,

    // Journal events
    JournalCreated {
        name: String,
    },

    // Manuscript events
    ManuscriptSubmitted {
        journal_id: String,
        title: String,
    },
    ManuscriptStatusChanged {
        from: ManuscriptStatus,
        to: ManuscriptStatus,
        event: String,
        version: u32,
    },

    // Invitation events
    InvitationIssued {
        manuscript_id: String,
        reviewer_email: String,
        expires_at: DateTime<Utc>,
    },
    InvitationAccepted {
        assignment_id: String,
    },
    InvitationDeclined {
        reason: Option<String>,
    },
    InvitationExpired,

    // Assignment events
    AssignmentCreated {
        manuscript_id: String,
        reviewer_id: String,
        status: AssignmentStatus,
    },
    AssignmentStatusChanged {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },
    ReviewDraftSaved,
    ReviewSubmitted {
        recommendation: Option<Recommendation>,
    },

    // Decision events
    DecisionRecorded {
        manuscript_id: String,
        decision_type: DecisionType,
        version: u32,
    },

    // Correspondence events
    CorrespondenceRecorded {
        manuscript_id: String,
        delivery: DeliveryStatus,
    },
    CorrespondenceRead,
}

impl EventPayload {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            EventPayload::UserRegistered { email } => format!("User registered: {}", email),
            EventPayload::RoleRequested { role, .. } => format!("Requested role {}", role),
            EventPayload::RoleDecided { role, approved, .. } => format!(
                "Role {} {}",
                role,
                if *approved { "approved" } else { "rejected" }
            ),
            EventPayload::ReviewerRoleGranted { journal_id } => {
                format!("Reviewer role granted for journal {}", journal_id)
            }
            EventPayload::ActiveRoleSwitched { role } => format!("Now acting as {}", role),
            EventPayload::UserDeactivated => "User deactivated".to_string(),
            EventPayload::JournalCreated { name } => format!("Journal created: {}", name),
            EventPayload::ManuscriptSubmitted { title, .. } => format!("Submitted: {}", title),
            EventPayload::ManuscriptStatusChanged { from, to, version, .. } => {
                format!("Status: {} → {} (v{})", from, to, version)
            }
            EventPayload::InvitationIssued { reviewer_email, .. } => {
                format!("Reviewer invited: {}", reviewer_email)
            }
            EventPayload::InvitationAccepted { .. } => "Invitation accepted".to_string(),
            EventPayload::InvitationDeclined { reason } => format!(
                "Invitation declined{}",
                reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default()
            ),
            EventPayload::InvitationExpired => "Invitation expired".to_string(),
            EventPayload::AssignmentCreated { reviewer_id, .. } => {
                format!("Reviewer {} assigned", reviewer_id)
            }
            EventPayload::AssignmentStatusChanged { from, to } => {
                format!("Assignment: {} → {}", from, to)
            }
            EventPayload::ReviewDraftSaved => "Review draft saved".to_string(),
            EventPayload::ReviewSubmitted { recommendation } => format!(
                "Review submitted{}",
                recommendation
                    .map(|r| format!(" recommending {}", r))
                    .unwrap_or_default()
            ),
            EventPayload::DecisionRecorded {
                decision_type,
                version,
                ..
            } => format!("Decision on v{}: {}", version, decision_type),
            EventPayload::CorrespondenceRecorded { delivery, .. } => {
                format!("Correspondence logged ({})", delivery)
            }
            EventPayload::CorrespondenceRead => "Correspondence read".to_string(),
        }
    }
}
