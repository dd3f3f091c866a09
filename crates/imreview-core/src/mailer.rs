//! Outgoing mail side effect
//!
//! The engine never delivers mail itself. It hands an [`OutgoingMail`] to a
//! [`Mailer`] and records the returned [`DeliveryStatus`]; a failed delivery
//! never fails the state transition that requested it.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Outcome of a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// No delivery was requested; the record is log-only
    NotAttempted,
    Sent,
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::NotAttempted => write!(f, "not_attempted"),
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What a message is about, for templating by the delivery backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailKind {
    ReviewInvitation,
    Correspondence,
}

/// A message handed to the mailer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub kind: MailKind,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery backend
pub trait Mailer: Send + Sync + std::fmt::Debug {
    fn send(&self, mail: &OutgoingMail) -> DeliveryStatus;
}

/// Writes messages to the log and reports them as sent
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> DeliveryStatus {
        tracing::info!(to = %mail.to, kind = ?mail.kind, subject = %mail.subject, "Mail queued");
        DeliveryStatus::Sent
    }
}

/// Captures messages in memory; can be switched to fail every delivery
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: Mutex<bool>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = failing;
    }

    /// Messages delivered so far
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: &OutgoingMail) -> DeliveryStatus {
        if *self.failing.lock().unwrap_or_else(|e| e.into_inner()) {
            return DeliveryStatus::Failed;
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(mail.clone());
        DeliveryStatus::Sent
    }
}
