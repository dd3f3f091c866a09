//! Property tests for the manuscript lifecycle and the review tally

use chrono::{Duration, TimeZone, Utc};
use imreview_core::config::RevisionConfig;
use imreview_core::manuscript::PublicationDetails;
use imreview_core::{
    FileRef, JournalId, Manuscript, ManuscriptEvent, ManuscriptStatus, NewManuscript,
    RevisionSeverity, UserId,
};
use proptest::prelude::*;

fn fresh_manuscript() -> Manuscript {
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
    Manuscript::submit(
        UserId::new(),
        NewManuscript {
            journal_id: JournalId::new(),
            title: "Folding a lifecycle".to_string(),
            abstract_text: "Events in, statuses out.".to_string(),
            keywords: Vec::new(),
            co_authors: Vec::new(),
            file: FileRef::new("uploads/v1.pdf"),
            research_area: None,
        },
        now,
    )
    .unwrap()
}

fn event_strategy() -> impl Strategy<Value = ManuscriptEvent> {
    prop_oneof![
        Just(ManuscriptEvent::Submit),
        Just(ManuscriptEvent::SendForReview),
        Just(ManuscriptEvent::RequestRevision {
            severity: RevisionSeverity::Minor
        }),
        Just(ManuscriptEvent::RequestRevision {
            severity: RevisionSeverity::Major
        }),
        Just(ManuscriptEvent::Resubmit {
            file: FileRef::new("uploads/next.pdf"),
            reason: "Addressed the reports".to_string(),
        }),
        Just(ManuscriptEvent::Accept),
        Just(ManuscriptEvent::Reject),
        Just(ManuscriptEvent::BeginPublication),
        Just(ManuscriptEvent::Publish(PublicationDetails {
            volume: 4,
            issue: 2,
            page_start: Some(10),
            page_end: Some(20),
            doi: "10.5555/v4i2.test".to_string(),
            published_at: Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
        })),
        Just(ManuscriptEvent::Withdraw {
            reason: "Changed plans".to_string(),
        }),
    ]
}

// === Lifecycle fold ===

proptest! {
    #[test]
    fn test_apply_follows_the_transition_table(events in prop::collection::vec(event_strategy(), 0..30)) {
        let revision = RevisionConfig::default();
        let actor = UserId::new();
        let mut manuscript = fresh_manuscript();
        let mut now = manuscript.submitted_at;

        for event in events {
            now += Duration::hours(1);
            let before = manuscript.clone();
            match before.status.target(&event) {
                Some(target) => {
                    let change = manuscript.apply(event.clone(), actor, now, &revision).unwrap();
                    prop_assert_eq!(change.from, Some(before.status));
                    prop_assert_eq!(change.to, target);
                    prop_assert_eq!(manuscript.status, target);
                    prop_assert_eq!(manuscript.row_version, before.row_version + 1);
                    prop_assert_eq!(manuscript.status_history.len(), before.status_history.len() + 1);
                }
                None => {
                    prop_assert!(manuscript.apply(event, actor, now, &revision).is_err());
                    prop_assert_eq!(&manuscript, &before);
                }
            }
        }
    }

    #[test]
    fn test_terminal_statuses_never_change(events in prop::collection::vec(event_strategy(), 1..30)) {
        let revision = RevisionConfig::default();
        let actor = UserId::new();
        let mut manuscript = fresh_manuscript();
        let mut now = manuscript.submitted_at;
        let mut terminal: Option<ManuscriptStatus> = None;

        for event in events {
            now += Duration::hours(1);
            let _ = manuscript.apply(event, actor, now, &revision);
            if let Some(status) = terminal {
                prop_assert_eq!(manuscript.status, status);
            } else if manuscript.status.is_terminal() {
                terminal = Some(manuscript.status);
            }
        }
    }

    #[test]
    fn test_version_counts_resubmissions(events in prop::collection::vec(event_strategy(), 0..40)) {
        let revision = RevisionConfig::default();
        let actor = UserId::new();
        let mut manuscript = fresh_manuscript();
        let mut now = manuscript.submitted_at;
        let mut resubmissions = 0;

        for event in events {
            now += Duration::hours(1);
            let is_resubmit = matches!(event, ManuscriptEvent::Resubmit { .. });
            if manuscript.apply(event, actor, now, &revision).is_ok() && is_resubmit {
                resubmissions += 1;
            }
        }
        prop_assert_eq!(manuscript.version_number, 1 + resubmissions);
        prop_assert_eq!(manuscript.versions.len() as u32, manuscript.version_number);
        prop_assert_eq!(
            manuscript.versions.iter().filter(|v| !v.archived).count(),
            1
        );
    }
}

// === Transition table spot checks ===

#[test]
fn test_revision_deadline_follows_severity() {
    let revision = RevisionConfig::default();
    let actor = UserId::new();
    let mut manuscript = fresh_manuscript();
    let now = manuscript.submitted_at;
    manuscript
        .apply(ManuscriptEvent::SendForReview, actor, now, &revision)
        .unwrap();
    manuscript
        .apply(
            ManuscriptEvent::RequestRevision {
                severity: RevisionSeverity::Major,
            },
            actor,
            now,
            &revision,
        )
        .unwrap();
    assert_eq!(
        manuscript.revision_deadline,
        Some(now + Duration::days(i64::from(revision.major_deadline_days)))
    );

    manuscript
        .apply(
            ManuscriptEvent::Resubmit {
                file: FileRef::new("uploads/v2.pdf"),
                reason: "Rewrote the analysis".to_string(),
            },
            actor,
            now,
            &revision,
        )
        .unwrap();
    assert_eq!(manuscript.revision_deadline, None);
    assert_eq!(manuscript.status, ManuscriptStatus::Resubmitted);
}

#[test]
fn test_blank_resubmission_is_rejected_without_change() {
    let revision = RevisionConfig::default();
    let actor = UserId::new();
    let mut manuscript = fresh_manuscript();
    let now = manuscript.submitted_at;
    manuscript
        .apply(ManuscriptEvent::SendForReview, actor, now, &revision)
        .unwrap();
    manuscript
        .apply(
            ManuscriptEvent::RequestRevision {
                severity: RevisionSeverity::Minor,
            },
            actor,
            now,
            &revision,
        )
        .unwrap();
    let before = manuscript.clone();

    let err = manuscript
        .apply(
            ManuscriptEvent::Resubmit {
                file: FileRef::new("  "),
                reason: String::new(),
            },
            actor,
            now,
            &revision,
        )
        .unwrap_err();
    assert_eq!(err.field_errors().len(), 2);
    assert_eq!(manuscript, before);
}
