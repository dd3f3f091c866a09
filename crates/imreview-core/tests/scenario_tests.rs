//! End-to-end review scenarios driven through the editorial office

mod common;

use chrono::Duration;
use common::{full_review, Fixture};
use imreview_core::mailer::MailKind;
use imreview_core::{
    AcceptOutcome, AssignmentStatus, DecisionPayload, DecisionType, ErrorKind, FileRef,
    InvitationStatus, ManuscriptStatus, Recommendation, RequestContext, RevisionSeverity,
};

// === Scenario A: invite and accept ===

#[test]
fn test_invitation_accept_creates_pending_assignment() {
    let fx = Fixture::new();
    let m = fx.submit();
    assert_eq!(m.status, ManuscriptStatus::Submitted);
    assert_eq!(m.version_number, 1);

    let m = fx.office.send_for_review(&fx.editor, &m.id).unwrap();
    assert_eq!(m.status, ManuscriptStatus::UnderReview);

    let reviewer = fx
        .office
        .register_user("rev@lab.example", "Rita Reviewer")
        .unwrap();
    let invitation = fx.invite(&m.id, "rev@lab.example", Some(14));
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert_eq!(invitation.expires_at, fx.clock_now() + Duration::days(14));

    let outcome = fx
        .office
        .accept_invitation(Some(&RequestContext::new(reviewer.id)), &invitation.token)
        .unwrap();
    let AcceptOutcome::Accepted {
        invitation,
        assignment,
    } = outcome
    else {
        panic!("expected the invitation to be accepted");
    };
    assert_eq!(invitation.status, InvitationStatus::Accepted);
    assert_eq!(invitation.assignment_id, Some(assignment.id));
    assert_eq!(assignment.status, AssignmentStatus::Pending);
    assert_eq!(assignment.manuscript_id, m.id);
    assert_eq!(assignment.reviewer_id, reviewer.id);
    assert_eq!(assignment.manuscript_version, 1);
    assert_eq!(
        fx.office.invitation_status(&invitation.token).unwrap(),
        InvitationStatus::Accepted
    );

    let mail = fx.mailer.sent();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].kind, MailKind::ReviewInvitation);
    assert_eq!(mail[0].to, "rev@lab.example");
    assert!(mail[0].body.contains(invitation.token.as_str()));
}

// === Scenario B: review and accept ===

#[test]
fn test_completed_review_allows_acceptance() {
    let fx = Fixture::new();
    let m = fx.in_review();
    let (reviewer, assignment) = fx.reviewer_on(&m.id, "rev@lab.example");

    let done = fx.complete_review(&reviewer, &assignment.id, Recommendation::Accept);
    assert_eq!(done.status, AssignmentStatus::Completed);

    let tally = fx.office.review_tally(&fx.editor, &m.id).unwrap();
    assert_eq!(tally.completed, 1);
    assert_eq!(tally.outstanding, 0);
    assert!(tally.ready_for_decision);
    assert_eq!(tally.recommendations, vec![Recommendation::Accept]);

    let decision = fx
        .office
        .record_decision(&fx.editor, &m.id, DecisionPayload::accept("Clear and correct."))
        .unwrap();
    assert_eq!(decision.decision_type, DecisionType::Accept);
    assert_eq!(decision.manuscript_version, 1);
    assert_eq!(
        fx.office.manuscript(&fx.author, &m.id).unwrap().status,
        ManuscriptStatus::Accepted
    );
}

// === Scenario C: revision and resubmission ===

#[test]
fn test_revision_then_resubmit_returns_to_review() {
    let fx = Fixture::new();
    let m = fx.in_review();
    let (reviewer, assignment) = fx.reviewer_on(&m.id, "rev@lab.example");
    fx.complete_review(&reviewer, &assignment.id, Recommendation::MinorRevision);

    fx.office
        .record_decision(
            &fx.editor,
            &m.id,
            DecisionPayload::revise(RevisionSeverity::Minor, "Fix the typos."),
        )
        .unwrap();
    let m = fx.office.manuscript(&fx.author, &m.id).unwrap();
    assert_eq!(m.status, ManuscriptStatus::Correction);
    assert_eq!(m.revision_deadline, Some(fx.clock_now() + Duration::days(14)));

    let m = fx
        .office
        .resubmit(
            &fx.author,
            &m.id,
            FileRef::new("uploads/halo-v2.pdf"),
            "fixed typos",
        )
        .unwrap();
    assert_eq!(m.version_number, 2);
    assert_eq!(m.status, ManuscriptStatus::UnderReview);
    assert_eq!(m.revision_deadline, None);
    assert_eq!(m.versions.len(), 2);
    assert!(m.versions[0].archived);
    assert!(!m.versions[1].archived);
    assert_eq!(m.current_file(), Some(&FileRef::new("uploads/halo-v2.pdf")));

    // The new version needs its own reviews
    let tally = fx.office.review_tally(&fx.editor, &m.id).unwrap();
    assert_eq!(tally.manuscript_version, 2);
    assert_eq!(tally.total, 0);
    assert!(!tally.ready_for_decision);
}

// === Scenario D: expiry ===

#[test]
fn test_invitation_expires_lazily() {
    let fx = Fixture::new();
    let m = fx.in_review();
    fx.office
        .register_user("late@lab.example", "Larry Late")
        .unwrap();
    let invitation = fx.invite(&m.id, "late@lab.example", Some(1));

    fx.clock.advance_days(2);
    assert_eq!(
        fx.office.invitation_status(&invitation.token).unwrap(),
        InvitationStatus::Expired
    );

    let err = fx
        .office
        .accept_invitation(None, &invitation.token)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Expired);

    // Expiry is recorded once in the audit trail
    let history = fx
        .office
        .history(&fx.editor, invitation.token.as_str())
        .unwrap();
    let expired = history
        .iter()
        .filter(|e| e.payload == imreview_core::EventPayload::InvitationExpired)
        .count();
    assert_eq!(expired, 1);
}

// === Scenario E: duplicate invitation ===

#[test]
fn test_second_invitation_is_already_assigned() {
    let fx = Fixture::new();
    let m = fx.in_review();
    fx.invite(&m.id, "rev@lab.example", None);

    let err = fx
        .office
        .invite_reviewer(
            &fx.editor,
            &m.id,
            imreview_core::InviteRequest {
                reviewer_email: "REV@lab.example".to_string(),
                due_days: None,
                message: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyAssigned);
    assert!(err.kind().is_idempotency_guard());
}

#[test]
fn test_reinvite_after_decline_is_allowed() {
    let fx = Fixture::new();
    let m = fx.in_review();
    let first = fx.invite(&m.id, "rev@lab.example", None);
    fx.office
        .decline_invitation(None, &first.token, Some("Travelling".to_string()))
        .unwrap();

    let second = fx.invite(&m.id, "rev@lab.example", None);
    assert_ne!(first.token, second.token);
}

#[test]
fn test_full_review_fixture_is_complete() {
    let draft = full_review(Recommendation::Reject);
    assert!(draft.ratings.fields().iter().all(|(_, r)| r.is_some()));
}
