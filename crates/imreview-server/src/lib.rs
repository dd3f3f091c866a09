//! Imreview Server - Editorial office HTTP API
//!
//! JSON endpoints over the [`EditorialOffice`]. Callers identify themselves
//! with `Authorization: Bearer <user-id>`; engine errors map to stable
//! statuses (see [`error::status_for`]).

pub mod auth;
pub mod error;
pub mod http;

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use imreview_core::{EditorialOffice, Repository, ReviewConfig, ReviewError};

use error::ApiError;

/// Shared application state
pub struct AppState {
    pub office: EditorialOffice,
    pub repository: Option<Mutex<Repository>>,
}

impl AppState {
    pub fn new(office: EditorialOffice) -> Self {
        Self {
            office,
            repository: None,
        }
    }

    /// Create with persistence enabled
    ///
    /// Restores the stored snapshot on startup when the database has one.
    pub fn with_persistence(
        config: ReviewConfig,
        db_path: impl AsRef<Path>,
    ) -> Result<Self, ReviewError> {
        let repository = Repository::new(&db_path)?;
        let office = EditorialOffice::new(config);
        let snapshot = repository.load_snapshot()?;
        if snapshot.is_empty() {
            tracing::info!(path = ?db_path.as_ref(), "Starting with an empty office");
        } else {
            office.restore(snapshot)?;
            tracing::info!(path = ?db_path.as_ref(), "Loaded persisted state");
        }

        Ok(Self {
            office,
            repository: Some(Mutex::new(repository)),
        })
    }

    /// Save current state to persistence (if enabled)
    ///
    /// The snapshot is taken while holding the repository lock, so saves
    /// land in the order their snapshots were taken.
    pub fn save_state(&self) -> Result<(), ReviewError> {
        if let Some(ref repo_mutex) = self.repository {
            let repo = repo_mutex
                .lock()
                .map_err(|_| ReviewError::Internal("repository lock poisoned".to_string()))?;
            let snapshot = self.office.snapshot()?;
            repo.save_snapshot(&snapshot)?;
            tracing::debug!(events = snapshot.events.len(), "Saved state to persistence");
        }
        Ok(())
    }
}

/// Persist the office after every successful mutating request
///
/// A failed save turns the response into an error; the change is applied
/// in memory but not yet durable.
async fn persist_after_mutation(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mutating = request.method() != Method::GET;
    let response = next.run(request).await;
    if mutating && response.status().is_success() {
        if let Err(e) = state.save_state() {
            tracing::error!(error = %e, "Failed to persist office state");
            return ApiError::from(e).into_response();
        }
    }
    response
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // User and role endpoints
        .route("/users", post(http::register_user).get(http::list_users))
        .route("/users/{id}/deactivate", post(http::deactivate_user))
        .route("/me", get(http::get_me))
        .route("/me/active-role", put(http::switch_active_role))
        .route(
            "/role-requests",
            post(http::request_role).get(http::pending_role_requests),
        )
        .route("/role-requests/{id}/decision", post(http::decide_role_request))
        // Journal endpoints
        .route("/journals", post(http::create_journal).get(http::list_journals))
        .route("/journals/{id}", get(http::get_journal))
        // Manuscript endpoints
        .route(
            "/manuscripts",
            post(http::submit_manuscript).get(http::list_manuscripts),
        )
        .route("/manuscripts/{id}", get(http::get_manuscript))
        .route("/manuscripts/{id}/send-for-review", post(http::send_for_review))
        .route("/manuscripts/{id}/resubmit", post(http::resubmit))
        .route("/manuscripts/{id}/withdraw", post(http::withdraw))
        .route(
            "/manuscripts/{id}/invitations",
            post(http::invite_reviewer).get(http::list_invitations),
        )
        .route(
            "/manuscripts/{id}/assignments",
            post(http::assign_reviewer).get(http::list_assignments),
        )
        .route("/manuscripts/{id}/tally", get(http::review_tally))
        .route(
            "/manuscripts/{id}/decisions",
            post(http::record_decision).get(http::list_decisions),
        )
        .route(
            "/manuscripts/{id}/begin-publication",
            post(http::begin_publication),
        )
        .route("/manuscripts/{id}/publish", post(http::publish))
        .route(
            "/manuscripts/{id}/correspondence",
            post(http::send_correspondence).get(http::list_correspondence),
        )
        .route(
            "/manuscripts/{id}/correspondence/unread",
            get(http::unread_count),
        )
        .route("/correspondence/{id}/read", post(http::mark_read))
        // Invitation endpoints; the token is the credential
        .route("/invitations/{token}", get(http::get_invitation))
        .route("/invitations/{token}/accept", post(http::accept_invitation))
        .route("/invitations/{token}/decline", post(http::decline_invitation))
        .route(
            "/invitations/{token}/register",
            post(http::complete_registration),
        )
        // Assignment endpoints
        .route("/assignments", get(http::my_assignments))
        .route("/assignments/{id}", get(http::get_assignment))
        .route("/assignments/{id}/respond", post(http::respond_to_assignment))
        .route("/assignments/{id}/start", post(http::start_review))
        .route("/assignments/{id}/draft", put(http::save_review_draft))
        .route("/assignments/{id}/submit", post(http::submit_review))
        .route("/assignments/{id}/withdraw", post(http::withdraw_from_review))
        // System endpoints
        .route("/history/{entity_id}", get(http::get_history))
        .route("/status", get(http::get_status))
        // Middleware
        .layer(middleware::from_fn_with_state(
            state.clone(),
            persist_after_mutation,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Imreview server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
