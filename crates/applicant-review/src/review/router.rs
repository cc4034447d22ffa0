use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::backend::{BackendError, ScoringBackend};
use super::controller::{MutationOutcome, OverrideController, OverrideError, SessionState};
use super::domain::{CandidateId, Criterion};
use super::presentation::PresentationHost;

/// Shared router state. The controller is single-writer by design; the mutex
/// serializes the cooperative edit lifecycle across requests.
pub struct ReviewState<B, P> {
    controller: Mutex<OverrideController<B, P>>,
}

impl<B, P> ReviewState<B, P>
where
    B: ScoringBackend,
    P: PresentationHost,
{
    pub fn new(controller: OverrideController<B, P>) -> Self {
        Self {
            controller: Mutex::new(controller),
        }
    }
}

/// Router builder exposing the assessment read and the override/potential
/// write endpoints over the controller.
pub fn review_router<B, P>(state: Arc<ReviewState<B, P>>) -> Router
where
    B: ScoringBackend + 'static,
    P: PresentationHost + 'static,
{
    Router::new()
        .route(
            "/api/v1/candidates/:candidate_id/assessment",
            get(assessment_handler::<B, P>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/criteria/:criterion/override",
            put(save_override_handler::<B, P>).delete(reset_override_handler::<B, P>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/overrides",
            get(list_overrides_handler::<B, P>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/potential",
            put(potential_handler::<B, P>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverrideRequest {
    pub(crate) score: f32,
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PotentialRequest {
    pub(crate) value: f32,
}

pub(crate) async fn assessment_handler<B, P>(
    State(state): State<Arc<ReviewState<B, P>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    B: ScoringBackend + 'static,
    P: PresentationHost + 'static,
{
    let candidate = CandidateId(candidate_id);
    let mut controller = state.controller.lock().expect("controller mutex poisoned");
    match controller.open_candidate(&candidate) {
        Ok(model) => (StatusCode::OK, axum::Json(model.view())).into_response(),
        Err(err) => backend_error_response(&err),
    }
}

pub(crate) async fn list_overrides_handler<B, P>(
    State(state): State<Arc<ReviewState<B, P>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    B: ScoringBackend + 'static,
    P: PresentationHost + 'static,
{
    let candidate = CandidateId(candidate_id);
    let controller = state.controller.lock().expect("controller mutex poisoned");
    match controller.list_overrides(&candidate) {
        Ok(overrides) => (StatusCode::OK, axum::Json(overrides)).into_response(),
        Err(err) => backend_error_response(&err),
    }
}

pub(crate) async fn save_override_handler<B, P>(
    State(state): State<Arc<ReviewState<B, P>>>,
    Path((candidate_id, criterion)): Path<(String, String)>,
    axum::Json(body): axum::Json<OverrideRequest>,
) -> Response
where
    B: ScoringBackend + 'static,
    P: PresentationHost + 'static,
{
    let Some(criterion) = Criterion::from_key(&criterion) else {
        return unknown_criterion_response(&criterion);
    };
    let candidate = CandidateId(candidate_id);
    let mut controller = state.controller.lock().expect("controller mutex poisoned");

    // A session left open by an earlier rejected submission is reused; its
    // drafts are replaced by this request's body.
    if controller.session(&candidate, criterion).is_none() {
        if let Err(err) = controller.begin_edit(&candidate, criterion) {
            return override_error_response(&err);
        }
    }

    match controller.save(&candidate, criterion, body.score, &body.reason) {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => override_error_response(&err),
    }
}

pub(crate) async fn reset_override_handler<B, P>(
    State(state): State<Arc<ReviewState<B, P>>>,
    Path((candidate_id, criterion)): Path<(String, String)>,
) -> Response
where
    B: ScoringBackend + 'static,
    P: PresentationHost + 'static,
{
    let Some(criterion) = Criterion::from_key(&criterion) else {
        return unknown_criterion_response(&criterion);
    };
    let candidate = CandidateId(candidate_id);
    let mut controller = state.controller.lock().expect("controller mutex poisoned");

    // The DELETE request is the explicit confirmation for this destructive
    // operation, so the two-phase flow collapses into request + confirm.
    let pending_confirm = controller
        .session(&candidate, criterion)
        .map(|session| session.state == SessionState::ConfirmingReset)
        .unwrap_or(false);
    if !pending_confirm {
        if let Err(err) = controller.request_reset(&candidate, criterion) {
            return override_error_response(&err);
        }
    }

    match controller.confirm_reset(&candidate, criterion) {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => override_error_response(&err),
    }
}

pub(crate) async fn potential_handler<B, P>(
    State(state): State<Arc<ReviewState<B, P>>>,
    Path(candidate_id): Path<String>,
    axum::Json(body): axum::Json<PotentialRequest>,
) -> Response
where
    B: ScoringBackend + 'static,
    P: PresentationHost + 'static,
{
    let candidate = CandidateId(candidate_id);
    let mut controller = state.controller.lock().expect("controller mutex poisoned");
    match controller.update_potential(&candidate, body.value) {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => override_error_response(&err),
    }
}

fn outcome_response(outcome: MutationOutcome) -> Response {
    let payload = json!({
        "candidate_id": outcome.candidate,
        "assessment": outcome.refreshed.as_ref().map(|model| model.view()),
        "warning": outcome.warning.as_ref().map(|warning| warning.detail.clone()),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn override_error_response(err: &OverrideError) -> Response {
    let status = match err {
        OverrideError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OverrideError::Backend(backend) => return backend_error_response(backend),
        OverrideError::SessionAlreadyOpen { .. }
        | OverrideError::NoSession { .. }
        | OverrideError::SubmissionInFlight { .. } => StatusCode::CONFLICT,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn backend_error_response(err: &BackendError) -> Response {
    let status = match err {
        BackendError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BackendError::NotFound(_) => StatusCode::NOT_FOUND,
        BackendError::Transport(_) => StatusCode::BAD_GATEWAY,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn unknown_criterion_response(raw: &str) -> Response {
    let payload = json!({
        "error": format!("unknown criterion '{raw}'"),
        "known": Criterion::ALL.map(|criterion| criterion.key()),
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}
