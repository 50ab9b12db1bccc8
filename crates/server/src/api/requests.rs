//! Title request API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use moviezone_core::{RequestError, RequestRecord, RequestStatus, UserRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::handlers::{api_error, internal_error, ApiError};
use super::middleware::AuthUser;
use crate::state::AppState;

/// Maximum allowed limit for pending request queries
const MAX_LIMIT: usize = 100;

/// Default limit for pending request queries
const DEFAULT_LIMIT: usize = 20;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitRequestBody {
    pub user_id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct PendingParams {
    pub limit: Option<usize>,
}

/// A pending request with whatever the directory knows about its author.
#[derive(Debug, Serialize)]
pub struct PendingRequest {
    #[serde(flatten)]
    pub request: RequestRecord,
    pub user: Option<UserRecord>,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub requests: Vec<PendingRequest>,
}

fn request_error(e: RequestError) -> ApiError {
    match e {
        RequestError::NotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        RequestError::InvalidState { .. } => api_error(StatusCode::CONFLICT, e.to_string()),
        RequestError::Storage(_) => internal_error(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/requests
pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<RequestRecord>), ApiError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "title must not be empty"));
    }

    let record = state
        .requests()
        .submit(body.user_id, title)
        .map_err(request_error)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/requests/pending?limit=
///
/// Oldest first.
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PendingParams>,
) -> Result<Json<PendingResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let pending = state.requests().pending(limit).map_err(request_error)?;

    let mut requests = Vec::with_capacity(pending.len());
    for request in pending {
        let user = state
            .directory()
            .get_user(request.user_id)
            .map_err(internal_error)?;
        requests.push(PendingRequest { request, user });
    }

    Ok(Json(PendingResponse { requests }))
}

/// POST /api/v1/requests/{id}/accept
pub async fn accept_request(
    State(state): State<Arc<AppState>>,
    AuthUser(client): AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<RequestRecord>, ApiError> {
    set_status(&state, &client, id, RequestStatus::Accepted)
}

/// POST /api/v1/requests/{id}/reject
///
/// The request is marked deleted and kept.
pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    AuthUser(client): AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<RequestRecord>, ApiError> {
    set_status(&state, &client, id, RequestStatus::Deleted)
}

fn set_status(
    state: &AppState,
    client: &str,
    id: u64,
    status: RequestStatus,
) -> Result<Json<RequestRecord>, ApiError> {
    let record = state
        .requests()
        .set_status(id, status)
        .map_err(request_error)?;
    info!("Request {} marked {} via {}", id, status, client);
    Ok(Json(record))
}
