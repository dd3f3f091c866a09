//! Editorial decisions and publication

mod processor;
mod types;

pub use processor::EditorialDecisionProcessor;
pub use types::{Decision, DecisionLog, DecisionPayload, DecisionType, PublicationRequest};

pub use crate::manuscript::RevisionSeverity;
