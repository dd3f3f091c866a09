//! Shared fixtures for office integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use imreview_core::{
    AcceptOutcome, AssignmentId, EditorialOffice, FileRef, InviteRequest, Invitation, Journal,
    ManualClock, Manuscript, ManuscriptId, NewManuscript, Ratings, Recommendation,
    RecordingMailer, RequestContext, ReviewAssignment, ReviewConfig, ReviewDraft, Role,
    RoleDecision,
};

/// An office with a clock, a mail recorder, one journal and its staff
pub struct Fixture {
    pub office: EditorialOffice,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<RecordingMailer>,
    pub journal: Journal,
    pub admin: RequestContext,
    pub editor: RequestContext,
    pub author: RequestContext,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ReviewConfig::default())
    }

    pub fn with_config(config: ReviewConfig) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        ));
        let mailer = Arc::new(RecordingMailer::new());
        let office = EditorialOffice::new(config)
            .with_clock(clock.clone())
            .with_mailer(mailer.clone());

        let admin = office
            .bootstrap_admin("admin@journal.example", "Ada Admin")
            .unwrap();
        let admin = RequestContext::new(admin.id);
        let journal = office
            .create_journal(&admin, "Journal of Testing", "jot")
            .unwrap();

        let editor = office
            .register_user("editor@journal.example", "Eddie Editor")
            .unwrap();
        let editor = RequestContext::new(editor.id);
        let grant = office
            .request_role(&editor, Role::Editor, Some(journal.id), None)
            .unwrap();
        office
            .decide_role_request(&admin, &grant.id, RoleDecision::Approve, None)
            .unwrap();
        office.switch_active_role(&editor, Role::Editor).unwrap();

        let author = office
            .register_user("author@uni.example", "Ann Author")
            .unwrap();
        let author = RequestContext::new(author.id);

        Self {
            office,
            clock,
            mailer,
            journal,
            admin,
            editor,
            author,
        }
    }

    pub fn new_manuscript(&self) -> NewManuscript {
        NewManuscript {
            journal_id: self.journal.id,
            title: "Halo Mass Functions at High Redshift".to_string(),
            abstract_text: "We measure the halo mass function.".to_string(),
            keywords: vec!["cosmology".to_string()],
            co_authors: Vec::new(),
            file: FileRef::new("uploads/halo-v1.pdf"),
            research_area: Some("astrophysics".to_string()),
        }
    }

    /// A fresh submission in `submitted`
    pub fn submit(&self) -> Manuscript {
        self.office
            .submit_manuscript(&self.author, self.new_manuscript())
            .unwrap()
    }

    /// A submission already sent out for review
    pub fn in_review(&self) -> Manuscript {
        let m = self.submit();
        self.office.send_for_review(&self.editor, &m.id).unwrap()
    }

    pub fn invite(&self, manuscript: &ManuscriptId, email: &str, days: Option<u32>) -> Invitation {
        self.office
            .invite_reviewer(
                &self.editor,
                manuscript,
                InviteRequest {
                    reviewer_email: email.to_string(),
                    due_days: days,
                    message: None,
                },
            )
            .unwrap()
    }

    /// Register `email`, invite them, accept, and switch them to reviewer
    pub fn reviewer_on(
        &self,
        manuscript: &ManuscriptId,
        email: &str,
    ) -> (RequestContext, ReviewAssignment) {
        let ctx = match self.office.find_user_by_email(email).unwrap() {
            Some(user) => RequestContext::new(user.id),
            None => RequestContext::new(self.office.register_user(email, "Rev Iewer").unwrap().id),
        };
        let invitation = self.invite(manuscript, email, None);
        let assignment = match self
            .office
            .accept_invitation(Some(&ctx), &invitation.token)
            .unwrap()
        {
            AcceptOutcome::Accepted { assignment, .. } => assignment,
            other => panic!("expected acceptance, got {:?}", other),
        };
        self.office.switch_active_role(&ctx, Role::Reviewer).unwrap();
        (ctx, assignment)
    }

    pub fn complete_review(
        &self,
        reviewer: &RequestContext,
        assignment: &AssignmentId,
        recommendation: Recommendation,
    ) -> ReviewAssignment {
        self.office
            .submit_review(reviewer, assignment, full_review(recommendation))
            .unwrap()
    }
}

pub fn full_review(recommendation: Recommendation) -> ReviewDraft {
    ReviewDraft {
        ratings: Ratings {
            originality: Some(4),
            significance: Some(4),
            methodology: Some(3),
            clarity: Some(5),
        },
        recommendation: Some(recommendation),
        comments_to_author: Some("Solid work.".to_string()),
        confidential_comments: None,
        report_file: None,
    }
}

impl Fixture {
    pub fn clock_now(&self) -> chrono::DateTime<Utc> {
        use imreview_core::Clock;
        self.clock.now()
    }
}
