//! Editorial decision processing and publication

use chrono::{DateTime, Utc};

use super::{Decision, DecisionLog, DecisionPayload, DecisionType, PublicationRequest};
use crate::assignment::ReviewTally;
use crate::config::ReviewConfig;
use crate::error::{Result, ReviewError, Validator};
use crate::id::{DecisionId, UserId};
use crate::manuscript::{
    Manuscript, ManuscriptEvent, ManuscriptStatus, PublicationDetails, StatusChange,
};

/// Applies editorial decisions and publication to a manuscript
///
/// Authorization happens before these calls; the processor enforces the
/// decision rules themselves.
#[derive(Debug, Clone, Copy)]
pub struct EditorialDecisionProcessor<'a> {
    config: &'a ReviewConfig,
}

impl<'a> EditorialDecisionProcessor<'a> {
    pub fn new(config: &'a ReviewConfig) -> Self {
        Self { config }
    }

    /// Record a decision on the current version and apply its event
    pub fn decide(
        &self,
        log: &mut DecisionLog,
        manuscript: &mut Manuscript,
        tally: &ReviewTally,
        payload: DecisionPayload,
        editor: UserId,
        now: DateTime<Utc>,
    ) -> Result<(Decision, StatusChange)> {
        if let Some(existing) = log.active_for(manuscript.version_number) {
            return Err(ReviewError::AlreadyResolved {
                entity: "Decision for manuscript".to_string(),
                id: format!("{} v{}", manuscript.id, manuscript.version_number),
                status: existing.decision_type.to_string(),
            });
        }

        let mut v = Validator::new();
        v.require_text(&payload.reasoning, "reasoning");
        match payload.decision_type {
            DecisionType::RequestRevision => {
                v.check(
                    payload.severity.is_some(),
                    "severity",
                    "is required for a revision request",
                );
            }
            DecisionType::Accept | DecisionType::Reject => {
                v.check(
                    payload.severity.is_none(),
                    "severity",
                    "is only allowed for a revision request",
                );
            }
        }
        v.finish()?;

        let event = payload.event().ok_or_else(|| {
            ReviewError::Internal("revision request without severity".to_string())
        })?;
        if manuscript.status.target(&event).is_none() {
            return Err(ReviewError::invalid_transition(
                "Manuscript",
                manuscript.status,
                &event,
            ));
        }

        if payload.decision_type.needs_reviews() && !tally.ready_for_decision {
            return Err(ReviewError::NotReady {
                manuscript: manuscript.id.to_string(),
                completed: tally.completed,
                required: self.config.review.min_completed_reviews.max(1),
            });
        }

        let change = manuscript.apply(event, editor, now, &self.config.revision)?;
        let decision = Decision {
            id: DecisionId::new(),
            manuscript_id: manuscript.id,
            manuscript_version: manuscript.version_number,
            decision_type: payload.decision_type,
            severity: payload.severity,
            reasoning: payload.reasoning.trim().to_string(),
            editor_id: editor,
            decided_at: now,
        };
        tracing::info!(
            manuscript_id = %manuscript.id,
            decision = %decision.decision_type,
            version = decision.manuscript_version,
            editor = %editor,
            "Decision recorded"
        );
        Ok((log.push(decision).clone(), change))
    }

    /// Move an accepted manuscript into production
    pub fn begin_publication(
        &self,
        manuscript: &mut Manuscript,
        editor: UserId,
        now: DateTime<Utc>,
    ) -> Result<StatusChange> {
        manuscript.apply(
            ManuscriptEvent::BeginPublication,
            editor,
            now,
            &self.config.revision,
        )
    }

    /// Build the publication record for `request`
    pub fn publication_details(
        &self,
        manuscript: &Manuscript,
        request: &PublicationRequest,
        now: DateTime<Utc>,
    ) -> Result<PublicationDetails> {
        let suffix = match request.doi_suffix.as_deref().map(str::trim) {
            Some(suffix) => {
                Validator::new()
                    .check(!suffix.is_empty(), "doi_suffix", "must not be empty")
                    .check(
                        !suffix.contains(char::is_whitespace),
                        "doi_suffix",
                        "must not contain whitespace",
                    )
                    .finish()?;
                suffix.to_string()
            }
            None => format!(
                "v{}i{}.{}",
                request.volume,
                request.issue,
                manuscript.id.short()
            ),
        };

        let details = PublicationDetails {
            volume: request.volume,
            issue: request.issue,
            page_start: request.page_start,
            page_end: request.page_end,
            doi: format!("{}/{}", self.config.publication.doi_prefix.trim(), suffix),
            published_at: now,
        };
        details.validate()?;
        Ok(details)
    }

    /// Publish an accepted manuscript, passing through production if needed
    pub fn publish(
        &self,
        manuscript: &mut Manuscript,
        request: &PublicationRequest,
        editor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<StatusChange>> {
        if !matches!(
            manuscript.status,
            ManuscriptStatus::Accepted | ManuscriptStatus::UnderPublication
        ) {
            return Err(ReviewError::invalid_transition(
                "Manuscript",
                manuscript.status,
                "publish",
            ));
        }

        let details = self.publication_details(manuscript, request, now)?;
        let mut changes = Vec::with_capacity(2);
        if manuscript.status == ManuscriptStatus::Accepted {
            changes.push(self.begin_publication(manuscript, editor, now)?);
        }
        let doi = details.doi.clone();
        changes.push(manuscript.apply(
            ManuscriptEvent::Publish(details),
            editor,
            now,
            &self.config.revision,
        )?);
        tracing::info!(manuscript_id = %manuscript.id, doi = %doi, "Manuscript published");
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::id::JournalId;
    use crate::manuscript::{FileRef, NewManuscript, RevisionSeverity};

    fn under_review(config: &ReviewConfig) -> Manuscript {
        let author = UserId::new();
        let mut m = Manuscript::submit(
            author,
            NewManuscript {
                journal_id: JournalId::new(),
                title: "T".to_string(),
                abstract_text: "A".to_string(),
                keywords: vec![],
                co_authors: vec![],
                file: FileRef::new("f.pdf"),
                research_area: None,
            },
            Utc::now(),
        )
        .unwrap();
        m.apply(
            ManuscriptEvent::SendForReview,
            UserId::new(),
            Utc::now(),
            &config.revision,
        )
        .unwrap();
        m
    }

    fn ready() -> ReviewTally {
        ReviewTally {
            manuscript_version: 1,
            total: 1,
            completed: 1,
            ready_for_decision: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_accept_requires_readiness() {
        let config = ReviewConfig::default();
        let processor = EditorialDecisionProcessor::new(&config);
        let mut log = DecisionLog::new();
        let mut m = under_review(&config);

        let err = processor
            .decide(
                &mut log,
                &mut m,
                &ReviewTally::default(),
                DecisionPayload::accept("fine"),
                UserId::new(),
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotReady);
        assert_eq!(m.status, ManuscriptStatus::UnderReview);
        assert!(log.all().is_empty());
    }

    #[test]
    fn test_reject_skips_readiness() {
        let config = ReviewConfig::default();
        let processor = EditorialDecisionProcessor::new(&config);
        let mut log = DecisionLog::new();
        let mut m = under_review(&config);
        processor
            .decide(
                &mut log,
                &mut m,
                &ReviewTally::default(),
                DecisionPayload::reject("out of scope"),
                UserId::new(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(m.status, ManuscriptStatus::Rejected);
    }

    #[test]
    fn test_one_decision_per_version() {
        let config = ReviewConfig::default();
        let processor = EditorialDecisionProcessor::new(&config);
        let mut log = DecisionLog::new();
        let mut m = under_review(&config);
        processor
            .decide(
                &mut log,
                &mut m,
                &ready(),
                DecisionPayload::revise(RevisionSeverity::Minor, "typos"),
                UserId::new(),
                Utc::now(),
            )
            .unwrap();
        let err = processor
            .decide(
                &mut log,
                &mut m,
                &ready(),
                DecisionPayload::reject("changed my mind"),
                UserId::new(),
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyResolved);
    }

    #[test]
    fn test_severity_rules() {
        let config = ReviewConfig::default();
        let processor = EditorialDecisionProcessor::new(&config);
        let mut log = DecisionLog::new();
        let mut m = under_review(&config);

        let mut payload = DecisionPayload::accept("");
        payload.severity = Some(RevisionSeverity::Major);
        let err = processor
            .decide(&mut log, &mut m, &ready(), payload, UserId::new(), Utc::now())
            .unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.clone()).collect();
        assert_eq!(fields, vec!["reasoning", "severity"]);

        let mut payload = DecisionPayload::revise(RevisionSeverity::Minor, "x");
        payload.severity = None;
        let err = processor
            .decide(&mut log, &mut m, &ready(), payload, UserId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "severity");
    }

    #[test]
    fn test_publish_from_accepted() {
        let config = ReviewConfig::default();
        let processor = EditorialDecisionProcessor::new(&config);
        let mut log = DecisionLog::new();
        let mut m = under_review(&config);
        let editor = UserId::new();
        processor
            .decide(
                &mut log,
                &mut m,
                &ready(),
                DecisionPayload::accept("great"),
                editor,
                Utc::now(),
            )
            .unwrap();

        let request = PublicationRequest {
            volume: 3,
            issue: 2,
            page_start: Some(10),
            page_end: Some(24),
            doi_suffix: None,
        };
        let changes = processor.publish(&mut m, &request, editor, Utc::now()).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(m.status, ManuscriptStatus::Published);
        let doi = &m.publication.as_ref().unwrap().doi;
        assert_eq!(doi, &format!("10.5555/v3i2.{}", m.id.short()));
    }

    #[test]
    fn test_publish_requires_acceptance() {
        let config = ReviewConfig::default();
        let processor = EditorialDecisionProcessor::new(&config);
        let mut m = under_review(&config);
        let request = PublicationRequest {
            volume: 1,
            issue: 1,
            ..Default::default()
        };
        let err = processor
            .publish(&mut m, &request, UserId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_publication_validation() {
        let config = ReviewConfig::default();
        let processor = EditorialDecisionProcessor::new(&config);
        let m = under_review(&config);
        let request = PublicationRequest {
            volume: 0,
            issue: 1,
            page_start: Some(5),
            page_end: Some(4),
            doi_suffix: Some("custom.1".to_string()),
        };
        let err = processor
            .publication_details(&m, &request, Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let request = PublicationRequest {
            volume: 1,
            issue: 1,
            doi_suffix: Some("custom.1".to_string()),
            ..Default::default()
        };
        let details = processor.publication_details(&m, &request, Utc::now()).unwrap();
        assert_eq!(details.doi, "10.5555/custom.1");
    }
}
