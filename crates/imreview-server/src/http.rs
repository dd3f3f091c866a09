//! HTTP endpoint handlers
//!
//! Handlers are thin: parse the request, call the office, serialize the
//! result. Authorization lives in the office.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use imreview_core::{
    AcceptOutcome, AssignmentId, CorrespondenceRecord, Decision, DecisionPayload, Event, FileRef,
    GrantId, Invitation, InvitationToken, InviteRequest, Journal, JournalId, Manuscript,
    ManuscriptId, NewCorrespondence, NewManuscript, PublicationRequest, RecordId,
    ReviewAssignment, ReviewDraft, ReviewTally, Role, RoleDecision, RoleGrant, User, UserId,
};

use crate::auth::{Caller, MaybeCaller};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

type Shared = State<Arc<AppState>>;

// ============================================================================
// Users and Roles
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
}

/// Register a new account; open to anyone the identity provider let through
pub async fn register_user(
    State(state): Shared,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .office
        .register_user(&request.email, &request.display_name)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): Shared, Caller(ctx): Caller) -> ApiResult<Vec<User>> {
    Ok(Json(state.office.users(&ctx)?))
}

pub async fn deactivate_user(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<UserId>,
) -> ApiResult<User> {
    Ok(Json(state.office.deactivate_user(&ctx, &id)?))
}

pub async fn get_me(State(state): Shared, Caller(ctx): Caller) -> ApiResult<User> {
    Ok(Json(state.office.me(&ctx)?))
}

#[derive(Debug, Deserialize)]
pub struct SwitchRoleRequest {
    pub role: Role,
}

pub async fn switch_active_role(
    State(state): Shared,
    Caller(ctx): Caller,
    Json(request): Json<SwitchRoleRequest>,
) -> ApiResult<User> {
    Ok(Json(state.office.switch_active_role(&ctx, request.role)?))
}

#[derive(Debug, Deserialize)]
pub struct RoleRequestBody {
    pub role: Role,
    #[serde(default)]
    pub journal_id: Option<JournalId>,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn request_role(
    State(state): Shared,
    Caller(ctx): Caller,
    Json(request): Json<RoleRequestBody>,
) -> Result<(StatusCode, Json<RoleGrant>), ApiError> {
    let grant =
        state
            .office
            .request_role(&ctx, request.role, request.journal_id, request.reason)?;
    Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn pending_role_requests(
    State(state): Shared,
    Caller(ctx): Caller,
) -> ApiResult<Vec<RoleGrant>> {
    Ok(Json(state.office.pending_role_requests(&ctx)?))
}

#[derive(Debug, Deserialize)]
pub struct RoleDecisionBody {
    pub decision: RoleDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn decide_role_request(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<GrantId>,
    Json(request): Json<RoleDecisionBody>,
) -> ApiResult<RoleGrant> {
    Ok(Json(state.office.decide_role_request(
        &ctx,
        &id,
        request.decision,
        request.notes,
    )?))
}

// ============================================================================
// Journals
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateJournalRequest {
    pub name: String,
    pub abbreviation: String,
}

pub async fn create_journal(
    State(state): Shared,
    Caller(ctx): Caller,
    Json(request): Json<CreateJournalRequest>,
) -> Result<(StatusCode, Json<Journal>), ApiError> {
    let journal = state
        .office
        .create_journal(&ctx, &request.name, &request.abbreviation)?;
    Ok((StatusCode::CREATED, Json(journal)))
}

pub async fn list_journals(State(state): Shared) -> ApiResult<Vec<Journal>> {
    Ok(Json(state.office.journals()?))
}

pub async fn get_journal(State(state): Shared, Path(id): Path<JournalId>) -> ApiResult<Journal> {
    Ok(Json(state.office.journal(&id)?))
}

// ============================================================================
// Manuscripts
// ============================================================================

pub async fn submit_manuscript(
    State(state): Shared,
    Caller(ctx): Caller,
    Json(request): Json<NewManuscript>,
) -> Result<(StatusCode, Json<Manuscript>), ApiError> {
    let manuscript = state.office.submit_manuscript(&ctx, request)?;
    Ok((StatusCode::CREATED, Json(manuscript)))
}

pub async fn list_manuscripts(
    State(state): Shared,
    Caller(ctx): Caller,
) -> ApiResult<Vec<Manuscript>> {
    Ok(Json(state.office.manuscripts(&ctx)?))
}

pub async fn get_manuscript(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Manuscript> {
    Ok(Json(state.office.manuscript(&ctx, &id)?))
}

pub async fn send_for_review(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Manuscript> {
    Ok(Json(state.office.send_for_review(&ctx, &id)?))
}

#[derive(Debug, Deserialize)]
pub struct ResubmitRequest {
    pub file: FileRef,
    pub reason: String,
}

pub async fn resubmit(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
    Json(request): Json<ResubmitRequest>,
) -> ApiResult<Manuscript> {
    Ok(Json(state.office.resubmit(
        &ctx,
        &id,
        request.file,
        &request.reason,
    )?))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub reason: String,
}

pub async fn withdraw(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
    Json(request): Json<WithdrawRequest>,
) -> ApiResult<Manuscript> {
    Ok(Json(state.office.withdraw(&ctx, &id, &request.reason)?))
}

// ============================================================================
// Invitations
// ============================================================================

pub async fn invite_reviewer(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
    Json(request): Json<InviteRequest>,
) -> Result<(StatusCode, Json<Invitation>), ApiError> {
    let invitation = state.office.invite_reviewer(&ctx, &id, request)?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

pub async fn list_invitations(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Vec<Invitation>> {
    Ok(Json(state.office.invitations_for(&ctx, &id)?))
}

pub async fn get_invitation(
    State(state): Shared,
    Path(token): Path<String>,
) -> ApiResult<Invitation> {
    Ok(Json(state.office.invitation(&InvitationToken(token))?))
}

pub async fn accept_invitation(
    State(state): Shared,
    MaybeCaller(ctx): MaybeCaller,
    Path(token): Path<String>,
) -> ApiResult<AcceptOutcome> {
    Ok(Json(
        state
            .office
            .accept_invitation(ctx.as_ref(), &InvitationToken(token))?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeclineRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn decline_invitation(
    State(state): Shared,
    MaybeCaller(ctx): MaybeCaller,
    Path(token): Path<String>,
    Json(request): Json<DeclineRequest>,
) -> ApiResult<Invitation> {
    Ok(Json(state.office.decline_invitation(
        ctx.as_ref(),
        &InvitationToken(token),
        request.reason,
    )?))
}

#[derive(Debug, Deserialize)]
pub struct CompleteRegistrationRequest {
    pub display_name: String,
}

pub async fn complete_registration(
    State(state): Shared,
    Path(token): Path<String>,
    Json(request): Json<CompleteRegistrationRequest>,
) -> ApiResult<AcceptOutcome> {
    Ok(Json(state.office.complete_registration(
        &InvitationToken(token),
        &request.display_name,
    )?))
}

// ============================================================================
// Assignments and Reviews
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub reviewer_id: UserId,
}

pub async fn assign_reviewer(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
    Json(request): Json<AssignRequest>,
) -> Result<(StatusCode, Json<ReviewAssignment>), ApiError> {
    let assignment = state
        .office
        .assign_reviewer(&ctx, &id, &request.reviewer_id)?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn list_assignments(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Vec<ReviewAssignment>> {
    Ok(Json(state.office.assignments_for(&ctx, &id)?))
}

pub async fn review_tally(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<ReviewTally> {
    Ok(Json(state.office.review_tally(&ctx, &id)?))
}

pub async fn my_assignments(
    State(state): Shared,
    Caller(ctx): Caller,
) -> ApiResult<Vec<ReviewAssignment>> {
    Ok(Json(state.office.my_assignments(&ctx)?))
}

pub async fn get_assignment(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<AssignmentId>,
) -> ApiResult<ReviewAssignment> {
    Ok(Json(state.office.assignment(&ctx, &id)?))
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub accept: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn respond_to_assignment(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<AssignmentId>,
    Json(request): Json<RespondRequest>,
) -> ApiResult<ReviewAssignment> {
    Ok(Json(state.office.respond_to_assignment(
        &ctx,
        &id,
        request.accept,
        request.reason,
    )?))
}

pub async fn start_review(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<AssignmentId>,
) -> ApiResult<ReviewAssignment> {
    Ok(Json(state.office.start_review(&ctx, &id)?))
}

pub async fn save_review_draft(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<AssignmentId>,
    Json(draft): Json<ReviewDraft>,
) -> ApiResult<ReviewAssignment> {
    Ok(Json(state.office.save_review_draft(&ctx, &id, draft)?))
}

pub async fn submit_review(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<AssignmentId>,
    Json(review): Json<ReviewDraft>,
) -> ApiResult<ReviewAssignment> {
    Ok(Json(state.office.submit_review(&ctx, &id, review)?))
}

pub async fn withdraw_from_review(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<AssignmentId>,
    Json(request): Json<DeclineRequest>,
) -> ApiResult<ReviewAssignment> {
    Ok(Json(
        state
            .office
            .withdraw_from_review(&ctx, &id, request.reason)?,
    ))
}

// ============================================================================
// Decisions and Publication
// ============================================================================

pub async fn record_decision(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
    Json(payload): Json<DecisionPayload>,
) -> Result<(StatusCode, Json<Decision>), ApiError> {
    let decision = state.office.record_decision(&ctx, &id, payload)?;
    Ok((StatusCode::CREATED, Json(decision)))
}

pub async fn list_decisions(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Vec<Decision>> {
    Ok(Json(state.office.decisions_for(&ctx, &id)?))
}

pub async fn begin_publication(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Manuscript> {
    Ok(Json(state.office.begin_publication(&ctx, &id)?))
}

pub async fn publish(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
    Json(request): Json<PublicationRequest>,
) -> ApiResult<Manuscript> {
    Ok(Json(state.office.publish(&ctx, &id, request)?))
}

// ============================================================================
// Correspondence
// ============================================================================

pub async fn send_correspondence(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
    Json(message): Json<NewCorrespondence>,
) -> Result<(StatusCode, Json<CorrespondenceRecord>), ApiError> {
    let record = state.office.send_correspondence(&ctx, &id, message)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_correspondence(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Vec<CorrespondenceRecord>> {
    Ok(Json(state.office.correspondence_for(&ctx, &id)?))
}

#[derive(Debug, Serialize)]
pub struct UnreadResponse {
    pub manuscript_id: ManuscriptId,
    pub unread: usize,
}

pub async fn unread_count(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<UnreadResponse> {
    let unread = state.office.unread_count(&ctx, &id)?;
    Ok(Json(UnreadResponse {
        manuscript_id: id,
        unread,
    }))
}

pub async fn mark_read(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(id): Path<RecordId>,
) -> ApiResult<CorrespondenceRecord> {
    Ok(Json(state.office.mark_correspondence_read(&ctx, &id)?))
}

// ============================================================================
// System
// ============================================================================

pub async fn get_history(
    State(state): Shared,
    Caller(ctx): Caller,
    Path(entity_id): Path<String>,
) -> ApiResult<Vec<Event>> {
    Ok(Json(state.office.history(&ctx, &entity_id)?))
}

/// Get system status
pub async fn get_status(State(state): Shared) -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "version": imreview_core::version(),
        "journals": state.office.journals()?.len(),
        "event_sequence": state.office.event_count()?,
        "persistence": state.repository.is_some(),
    })))
}
