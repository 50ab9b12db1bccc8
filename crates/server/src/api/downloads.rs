//! Download flow API handlers.
//!
//! The bot calls `tokens` when a user picks a file, sends them the returned
//! ad link, and calls `redeem` with whatever token comes back through the
//! `/start` deep link.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use moviezone_core::{Delivery, DownloadLink, GatewayError, LinkBuilder, StartPayload};
use serde::{Deserialize, Serialize};

use super::handlers::{api_error, internal_error, ApiError};
use crate::state::AppState;

/// The only thing a caller learns about a failed redemption.
pub const LINK_UNAVAILABLE: &str = "This link is unavailable or has expired";

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IssueTokenBody {
    pub user_id: i64,
    pub title_id: u64,
    pub quality: String,
}

#[derive(Debug, Deserialize)]
pub struct RedeemBody {
    pub token: String,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub removed: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/downloads/tokens
///
/// Issue a token and return the ad link the user has to open. A 500 left
/// no token behind, so the bot may retry it.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IssueTokenBody>,
) -> Result<(StatusCode, Json<DownloadLink>), ApiError> {
    match state
        .downloads()
        .start(body.user_id, body.title_id, &body.quality)
    {
        Ok(link) => Ok((StatusCode::CREATED, Json(link))),
        Err(GatewayError::NotFound(_)) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!(
                "Title {} has no {} file available",
                body.title_id, body.quality
            ),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// POST /api/v1/downloads/redeem
///
/// Trade a token for the file reference. Unknown, foreign, expired and used
/// tokens all get the same 404.
pub async fn redeem_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RedeemBody>,
) -> Result<Json<Delivery>, ApiError> {
    state
        .downloads()
        .finish(&body.token, body.user_id)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, LINK_UNAVAILABLE))
}

/// POST /api/v1/downloads/sweep
///
/// Purge expired tokens now instead of waiting for the sweeper.
pub async fn sweep(State(state): State<Arc<AppState>>) -> Result<Json<SweepResponse>, ApiError> {
    state
        .gateway()
        .sweep_expired()
        .map(|removed| Json(SweepResponse { removed }))
        .map_err(internal_error)
}

/// GET /api/v1/downloads/start/{payload}
///
/// Decode the argument of a `/start` command.
pub async fn decode_start(Path(payload): Path<String>) -> Json<StartPayload> {
    Json(LinkBuilder::parse_start_payload(&payload))
}
