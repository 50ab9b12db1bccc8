//! Catalog API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use moviezone_core::{
    CatalogStats, CategoryFilter, CategoryPage, FileVariant, NewTitle, TitleRecord, TitleStats,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::handlers::{api_error, internal_error, ApiError, SuccessResponse};
use super::middleware::AuthUser;
use crate::state::AppState;

/// Maximum allowed limit for title queries
const MAX_LIMIT: usize = 100;

/// Default limit for title queries
const DEFAULT_LIMIT: usize = 10;

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryParams {
    /// Exact category tag.
    pub name: Option<String>,
    /// List every title instead of one category.
    #[serde(default)]
    pub all: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TitleListResponse {
    pub titles: Vec<TitleRecord>,
}

/// One button of a channel post.
#[derive(Debug, Serialize)]
pub struct PostLink {
    pub quality: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct AddTitleResponse {
    pub id: u64,
    pub post_links: Vec<PostLink>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub all_label: String,
    pub categories: Vec<String>,
    pub languages: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/titles
///
/// Add a title and return the deep links for its channel post.
pub async fn add_title(
    State(state): State<Arc<AppState>>,
    AuthUser(client): AuthUser,
    Json(body): Json<NewTitle>,
) -> Result<(StatusCode, Json<AddTitleResponse>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "title must not be empty"));
    }

    let id = state.catalog().add_title(body).map_err(internal_error)?;
    info!("Title {} added via {}", id, client);

    let record = state
        .catalog()
        .get_title(id)
        .map_err(internal_error)?
        .ok_or_else(|| internal_error(format!("title {} vanished after insert", id)))?;
    let post_links = state
        .downloads()
        .links()
        .post_links(&record)
        .into_iter()
        .map(|(quality, url)| PostLink { quality, url })
        .collect();

    Ok((StatusCode::CREATED, Json(AddTitleResponse { id, post_links })))
}

/// GET /api/v1/titles/{id}
pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TitleRecord>, ApiError> {
    match state.catalog().get_title(id) {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Title {} not found", id),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// DELETE /api/v1/titles/{id}
pub async fn delete_title(
    State(state): State<Arc<AppState>>,
    AuthUser(client): AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    match state.catalog().delete_title(id) {
        Ok(true) => {
            info!("Title {} deleted via {}", id, client);
            Ok(Json(SuccessResponse {
                message: format!("Title {} deleted", id),
            }))
        }
        Ok(false) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Title {} not found", id),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// PUT /api/v1/titles/{id}/files/{quality}
///
/// Set or replace the file behind one quality label. Tokens already issued
/// keep the file they were issued for.
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    Path((id, quality)): Path<(u64, String)>,
    Json(variant): Json<FileVariant>,
) -> Result<Json<SuccessResponse>, ApiError> {
    match state.catalog().update_file(id, &quality, variant) {
        Ok(true) => Ok(Json(SuccessResponse {
            message: format!("Title {} {} updated", id, quality),
        })),
        Ok(false) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Title {} not found", id),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// POST /api/v1/titles/{id}/downloads
///
/// Count a download that happened outside the token flow.
pub async fn increment_downloads(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    match state.catalog().increment_download_count(id) {
        Ok(true) => Ok(Json(SuccessResponse {
            message: format!("Title {} download counted", id),
        })),
        Ok(false) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Title {} not found", id),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// GET /api/v1/titles/{id}/stats
pub async fn title_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TitleStats>, ApiError> {
    match state.catalog().title_stats(id) {
        Ok(Some(stats)) => Ok(Json(stats)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Title {} not found", id),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// GET /api/v1/titles/search?q=&limit=
///
/// First matches in storage order, not ranked.
pub async fn search_titles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<TitleListResponse>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "q must not be empty"));
    }

    let titles = state
        .catalog()
        .search_by_substring(query, clamp_limit(params.limit))
        .map_err(internal_error)?;
    Ok(Json(TitleListResponse { titles }))
}

/// GET /api/v1/titles/letter/{letter}?limit=
pub async fn titles_by_letter(
    State(state): State<Arc<AppState>>,
    Path(letter): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<TitleListResponse>, ApiError> {
    let mut chars = letter.chars();
    let letter = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "letter must be a single character",
            ))
        }
    };

    let titles = state
        .catalog()
        .search_by_first_letter(letter, clamp_limit(params.limit))
        .map_err(internal_error)?;
    Ok(Json(TitleListResponse { titles }))
}

/// GET /api/v1/titles/category?name=&all=&limit=&offset=
pub async fn titles_by_category(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryParams>,
) -> Result<Json<CategoryPage>, ApiError> {
    let filter = match (params.all, params.name) {
        (true, _) => CategoryFilter::All,
        (false, Some(name)) if name == state.config().catalog.all_category_label => {
            CategoryFilter::All
        }
        (false, Some(name)) if !name.is_empty() => CategoryFilter::Named(name),
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "either name or all=true is required",
            ))
        }
    };

    let page = state
        .catalog()
        .search_by_category(
            &filter,
            clamp_limit(params.limit),
            params.offset.unwrap_or(0),
        )
        .map_err(internal_error)?;
    Ok(Json(page))
}

/// GET /api/v1/uploaders/{id}/titles?limit=
///
/// Newest first.
pub async fn titles_by_uploader(
    State(state): State<Arc<AppState>>,
    Path(uploader_id): Path<i64>,
    Query(params): Query<LimitParams>,
) -> Result<Json<TitleListResponse>, ApiError> {
    let titles = state
        .catalog()
        .list_by_uploader(uploader_id, clamp_limit(params.limit))
        .map_err(internal_error)?;
    Ok(Json(TitleListResponse { titles }))
}

/// GET /api/v1/catalog/stats
pub async fn catalog_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CatalogStats>, ApiError> {
    state.catalog().stats().map(Json).map_err(internal_error)
}

/// GET /api/v1/catalog/categories
///
/// Reference lists the bot uses to build its category and language menus.
pub async fn categories(State(state): State<Arc<AppState>>) -> Json<CategoriesResponse> {
    let catalog = &state.config().catalog;
    Json(CategoriesResponse {
        all_label: catalog.all_category_label.clone(),
        categories: catalog.categories.clone(),
        languages: catalog.languages.clone(),
    })
}
