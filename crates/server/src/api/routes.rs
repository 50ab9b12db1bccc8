use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{directory, downloads, handlers, requests, titles};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Everything under /api/v1 except health needs credentials
    let protected = Router::new()
        .route("/config", get(handlers::get_config))
        // Titles
        .route("/titles", post(titles::add_title))
        .route("/titles/search", get(titles::search_titles))
        .route("/titles/letter/{letter}", get(titles::titles_by_letter))
        .route("/titles/category", get(titles::titles_by_category))
        .route(
            "/titles/{id}",
            get(titles::get_title).delete(titles::delete_title),
        )
        .route("/titles/{id}/files/{quality}", put(titles::update_file))
        .route("/titles/{id}/downloads", post(titles::increment_downloads))
        .route("/titles/{id}/stats", get(titles::title_stats))
        .route("/uploaders/{id}/titles", get(titles::titles_by_uploader))
        .route("/catalog/stats", get(titles::catalog_stats))
        .route("/catalog/categories", get(titles::categories))
        // Download tokens
        .route("/downloads/tokens", post(downloads::issue_token))
        .route("/downloads/redeem", post(downloads::redeem_token))
        .route("/downloads/sweep", post(downloads::sweep))
        .route("/downloads/start/{payload}", get(downloads::decode_start))
        // Title requests
        .route("/requests", post(requests::submit_request))
        .route("/requests/pending", get(requests::list_pending))
        .route("/requests/{id}/accept", post(requests::accept_request))
        .route("/requests/{id}/reject", post(requests::reject_request))
        // Users, admins, channels
        .route("/users/{id}", put(directory::upsert_user))
        .route("/users/{id}/role", get(directory::user_role))
        .route("/admins", get(directory::list_admins).post(directory::add_admin))
        .route("/admins/{identifier}", delete(directory::remove_admin))
        .route(
            "/channels",
            get(directory::list_channels).post(directory::add_channel),
        )
        .route("/channels/{identifier}", delete(directory::remove_channel))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
