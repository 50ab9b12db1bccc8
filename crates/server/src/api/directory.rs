//! Users, admins and channels API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use moviezone_core::{AdminRecord, ChannelRecord, NewAdmin, NewChannel, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::handlers::{api_error, internal_error, ApiError, SuccessResponse};
use super::middleware::AuthUser;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpsertUserBody {
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpsertUserResponse {
    pub user_id: i64,
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub user_id: i64,
    pub role: Role,
    pub can_manage_catalog: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub admins: Vec<AdminRecord>,
}

#[derive(Debug, Serialize)]
pub struct ChannelListResponse {
    pub channels: Vec<ChannelRecord>,
}

// ============================================================================
// Users
// ============================================================================

/// PUT /api/v1/users/{id}
///
/// Record a user seen by the bot. 201 when new, 200 otherwise.
pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(body): Json<UpsertUserBody>,
) -> Result<(StatusCode, Json<UpsertUserResponse>), ApiError> {
    let created = state
        .directory()
        .upsert_user(user_id, &body.first_name, body.username.as_deref())
        .map_err(internal_error)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(UpsertUserResponse { user_id, created })))
}

/// GET /api/v1/users/{id}/role
pub async fn user_role(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<RoleResponse>, ApiError> {
    let role = state.directory().role_of(user_id).map_err(internal_error)?;
    Ok(Json(RoleResponse {
        user_id,
        role,
        can_manage_catalog: role.can_manage_catalog(),
    }))
}

// ============================================================================
// Admins
// ============================================================================

/// GET /api/v1/admins
pub async fn list_admins(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminListResponse>, ApiError> {
    let admins = state.directory().admins().map_err(internal_error)?;
    Ok(Json(AdminListResponse { admins }))
}

/// POST /api/v1/admins
pub async fn add_admin(
    State(state): State<Arc<AppState>>,
    AuthUser(client): AuthUser,
    Json(body): Json<NewAdmin>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    let user_id = body.user_id;
    if body.short_name.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "short_name must not be empty",
        ));
    }

    match state.directory().add_admin(body) {
        Ok(true) => {
            info!("Admin {} added via {}", user_id, client);
            Ok((
                StatusCode::CREATED,
                Json(SuccessResponse {
                    message: format!("Admin {} added", user_id),
                }),
            ))
        }
        Ok(false) => Err(api_error(
            StatusCode::CONFLICT,
            format!("User {} is already an admin", user_id),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// DELETE /api/v1/admins/{identifier}
///
/// `identifier` is a user id or a short name.
pub async fn remove_admin(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    match state.directory().remove_admin(&identifier) {
        Ok(true) => Ok(Json(SuccessResponse {
            message: format!("Admin {} removed", identifier),
        })),
        Ok(false) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Admin {} not found", identifier),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

// ============================================================================
// Channels
// ============================================================================

/// GET /api/v1/channels
pub async fn list_channels(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChannelListResponse>, ApiError> {
    let channels = state.directory().channels().map_err(internal_error)?;
    Ok(Json(ChannelListResponse { channels }))
}

/// POST /api/v1/channels
pub async fn add_channel(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewChannel>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    let channel_id = body.channel_id.clone();
    if channel_id.trim().is_empty() || body.short_name.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "channel_id and short_name must not be empty",
        ));
    }

    match state.directory().add_channel(body) {
        Ok(true) => Ok((
            StatusCode::CREATED,
            Json(SuccessResponse {
                message: format!("Channel {} added", channel_id),
            }),
        )),
        Ok(false) => Err(api_error(
            StatusCode::CONFLICT,
            format!("Channel {} already exists", channel_id),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// DELETE /api/v1/channels/{identifier}
///
/// `identifier` is a channel id or a short name.
pub async fn remove_channel(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    match state.directory().remove_channel(&identifier) {
        Ok(true) => Ok(Json(SuccessResponse {
            message: format!("Channel {} removed", identifier),
        })),
        Ok(false) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Channel {} not found", identifier),
        )),
        Err(e) => Err(internal_error(e)),
    }
}
