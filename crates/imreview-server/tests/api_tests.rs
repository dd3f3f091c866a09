//! Router tests driven with `oneshot`

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use imreview_core::{
    AssignmentId, EditorialOffice, Ratings, Recommendation, RequestContext, ReviewConfig,
    ReviewDraft, UserId,
};
use imreview_server::{create_router, AppState};

struct Api {
    router: Router,
    state: Arc<AppState>,
}

impl Api {
    fn new() -> Self {
        Self::with_state(AppState::new(EditorialOffice::new(ReviewConfig::default())))
    }

    fn with_state(state: AppState) -> Self {
        let state = Arc::new(state);
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Admin, journal, approved editor and an author
    async fn staffed(&self) -> (String, String, String, String) {
        let admin = self
            .state
            .office
            .bootstrap_admin("admin@journal.example", "Ada Admin")
            .unwrap()
            .id
            .to_string();
        let (_, journal) = self
            .call(
                Method::POST,
                "/journals",
                Some(&admin),
                Some(json!({"name": "Journal of Testing", "abbreviation": "JOT"})),
            )
            .await;
        let journal = journal["id"].as_str().unwrap().to_string();

        let (_, editor) = self
            .call(
                Method::POST,
                "/users",
                None,
                Some(json!({"email": "editor@journal.example", "display_name": "Eddie"})),
            )
            .await;
        let editor = editor["id"].as_str().unwrap().to_string();
        let (_, grant) = self
            .call(
                Method::POST,
                "/role-requests",
                Some(&editor),
                Some(json!({"role": "editor", "journal_id": journal})),
            )
            .await;
        let uri = format!("/role-requests/{}/decision", grant["id"].as_str().unwrap());
        let (status, _) = self
            .call(Method::POST, &uri, Some(&admin), Some(json!({"decision": "approve"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = self
            .call(
                Method::PUT,
                "/me/active-role",
                Some(&editor),
                Some(json!({"role": "editor"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, author) = self
            .call(
                Method::POST,
                "/users",
                None,
                Some(json!({"email": "author@uni.example", "display_name": "Ann"})),
            )
            .await;
        let author = author["id"].as_str().unwrap().to_string();
        (admin, journal, editor, author)
    }

    async fn submit(&self, author: &str, journal: &str) -> String {
        let (status, manuscript) = self
            .call(
                Method::POST,
                "/manuscripts",
                Some(author),
                Some(json!({
                    "journal_id": journal,
                    "title": "Halo Mass Functions",
                    "abstract": "We measure the halo mass function.",
                    "keywords": ["cosmology"],
                    "co_authors": [],
                    "file": "uploads/v1.pdf",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", manuscript);
        manuscript["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_missing_bearer_is_unauthenticated() {
    let api = Api::new();
    let (status, body) = api.call(Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");

    let (status, _) = api.call(Method::GET, "/me", Some("nobody"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_user_is_forbidden() {
    let api = Api::new();
    let stranger = UserId::new().to_string();
    let (status, body) = api
        .call(Method::GET, "/users", Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_validation_errors_carry_fields() {
    let api = Api::new();
    let (_, journal, _, author) = api.staffed().await;
    let (status, body) = api
        .call(
            Method::POST,
            "/manuscripts",
            Some(&author),
            Some(json!({
                "journal_id": journal,
                "title": "  ",
                "abstract": "Something",
                "keywords": [],
                "co_authors": [],
                "file": "uploads/v1.pdf",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_error");
    assert_eq!(body["fields"][0]["field"], "title");
}

#[tokio::test]
async fn test_review_round_over_http() {
    let api = Api::new();
    let (_, journal, editor, author) = api.staffed().await;
    let manuscript = api.submit(&author, &journal).await;

    let uri = format!("/manuscripts/{}/send-for-review", manuscript);
    let (status, body) = api.call(Method::POST, &uri, Some(&editor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "under_review");

    // Early decision is refused
    let decisions = format!("/manuscripts/{}/decisions", manuscript);
    let accept = json!({"decision_type": "accept", "reasoning": "Fine"});
    let (status, body) = api
        .call(Method::POST, &decisions, Some(&editor), Some(accept.clone()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "not_ready");

    let invitations = format!("/manuscripts/{}/invitations", manuscript);
    let (status, invitation) = api
        .call(
            Method::POST,
            &invitations,
            Some(&editor),
            Some(json!({"reviewer_email": "rev@lab.example"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = invitation["token"].as_str().unwrap().to_string();

    // Second invite to the same address is an idempotency guard
    let (status, body) = api
        .call(
            Method::POST,
            &invitations,
            Some(&editor),
            Some(json!({"reviewer_email": "rev@lab.example"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_assigned");

    let (status, outcome) = api
        .call(Method::POST, &format!("/invitations/{}/accept", token), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "registration_required");

    let (status, outcome) = api
        .call(
            Method::POST,
            &format!("/invitations/{}/register", token),
            None,
            Some(json!({"display_name": "Rita Reviewer"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "accepted");
    let assignment = outcome["assignment"]["id"].as_str().unwrap().to_string();
    let reviewer = outcome["assignment"]["reviewer_id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = api
        .call(
            Method::PUT,
            "/me/active-role",
            Some(&reviewer),
            Some(json!({"role": "reviewer"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = api
        .call(
            Method::POST,
            &format!("/assignments/{}/submit", assignment),
            Some(&reviewer),
            Some(json!({
                "ratings": {"originality": 4, "significance": 4, "methodology": 3, "clarity": 5},
                "recommendation": "accept",
                "comments_to_author": "Nice work",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "completed");

    let (status, decision) = api
        .call(Method::POST, &decisions, Some(&editor), Some(accept))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(decision["decision_type"], "accept");

    let (status, body) = api
        .call(
            Method::POST,
            &format!("/manuscripts/{}/publish", manuscript),
            Some(&editor),
            Some(json!({"volume": 12, "issue": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "published");
    assert!(body["publication"]["doi"]
        .as_str()
        .unwrap()
        .starts_with("10.5555/v12i3."));

    // The reviewer cannot read editorial correspondence
    let (status, _) = api
        .call(
            Method::GET,
            &format!("/manuscripts/{}/correspondence", manuscript),
            Some(&reviewer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, history) = api
        .call(
            Method::GET,
            &format!("/history/{}", manuscript),
            Some(&editor),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(history.as_array().unwrap().len() >= 5);
}

#[tokio::test]
async fn test_unknown_invitation_is_not_found() {
    let api = Api::new();
    let (status, body) = api
        .call(Method::GET, "/invitations/does-not-exist", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_state_is_saved_after_mutations() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("office.sqlite");

    let journal_id = {
        let api = Api::with_state(
            AppState::with_persistence(ReviewConfig::default(), &path).unwrap(),
        );
        let (_, journal, _, author) = api.staffed().await;
        api.submit(&author, &journal).await;
        journal
    };

    let api = Api::with_state(AppState::with_persistence(ReviewConfig::default(), &path).unwrap());
    let (status, journals) = api.call(Method::GET, "/journals", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(journals[0]["id"], journal_id.as_str());
    let (_, status_body) = api.call(Method::GET, "/status", None, None).await;
    assert_eq!(status_body["persistence"], true);
    assert!(status_body["event_sequence"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_concurrent_saves_keep_the_submitted_review() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imreview.sqlite");
    let api = Api::with_state(AppState::with_persistence(ReviewConfig::default(), &path).unwrap());
    let (_, journal, editor, author) = api.staffed().await;
    let manuscript = api.submit(&author, &journal).await;
    let uri = format!("/manuscripts/{}/send-for-review", manuscript);
    api.call(Method::POST, &uri, Some(&editor), None).await;
    let (_, invitation) = api
        .call(
            Method::POST,
            &format!("/manuscripts/{}/invitations", manuscript),
            Some(&editor),
            Some(json!({"reviewer_email": "rev@lab.example"})),
        )
        .await;
    let token = invitation["token"].as_str().unwrap();
    let (status, outcome) = api
        .call(
            Method::POST,
            &format!("/invitations/{}/register", token),
            None,
            Some(json!({"display_name": "Rita Reviewer"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let assignment_id = outcome["assignment"]["id"].as_str().unwrap().to_string();
    let reviewer_id = outcome["assignment"]["reviewer_id"].as_str().unwrap().to_string();
    api.call(
        Method::PUT,
        "/me/active-role",
        Some(&reviewer_id),
        Some(json!({"role": "reviewer"})),
    )
    .await;

    let reviewer = RequestContext::new(UserId::parse(&reviewer_id).unwrap());
    let assignment = AssignmentId::parse(&assignment_id).unwrap();
    let review = ReviewDraft {
        ratings: Ratings {
            originality: Some(4),
            significance: Some(4),
            methodology: Some(3),
            clarity: Some(5),
        },
        recommendation: Some(Recommendation::Accept),
        comments_to_author: Some("Nice work".to_string()),
        ..Default::default()
    };
    let state = api.state.clone();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..5 {
                    state.save_state().unwrap();
                }
            });
        }
        s.spawn(|| {
            state.office.submit_review(&reviewer, &assignment, review).unwrap();
            state.save_state().unwrap();
        });
    });
    drop(state);
    drop(api);

    let api = Api::with_state(AppState::with_persistence(ReviewConfig::default(), &path).unwrap());
    let (status, body) = api
        .call(
            Method::GET,
            &format!("/assignments/{}", assignment_id),
            Some(&reviewer_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}
