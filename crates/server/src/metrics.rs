//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the MovieZone server:
//! - HTTP request metrics (latency, counts, auth failures)
//! - Catalog, token and request gauges (collected when `/metrics` is scraped)
//!
//! Counters owned by core (token issuance, redemption outcomes, ...) are
//! registered here as well.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use tracing::{error, warn};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "moviezone_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("moviezone_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "moviezone_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "moviezone_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// State gauges
// =============================================================================

/// Titles in the catalog.
pub static CATALOG_TITLES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("moviezone_catalog_titles", "Titles currently in the catalog").unwrap()
});

/// Downloads recorded across all titles.
pub static CATALOG_DOWNLOADS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "moviezone_catalog_downloads",
        "Sum of per-title download counters",
    )
    .unwrap()
});

/// Tokens currently stored (issued or redeemed, not yet purged).
pub static TOKENS_STORED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("moviezone_tokens_stored", "Tokens currently in storage").unwrap()
});

/// Whether the background token sweeper is running (1) or not (0).
pub static TOKEN_SWEEPER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "moviezone_token_sweeper_running",
        "Whether the expired-token sweeper is running",
    )
    .unwrap()
});

/// Users who have talked to the bot.
pub static DIRECTORY_USERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("moviezone_directory_users", "Users known to the bot").unwrap()
});

/// Requests waiting for an admin (capped at the scan limit).
pub static REQUESTS_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "moviezone_requests_pending",
        "Title requests waiting for triage",
    )
    .unwrap()
});

const PENDING_SCAN_LIMIT: usize = 10_000;

// =============================================================================
// Registration and encoding
// =============================================================================

fn register_metrics(registry: &Registry) {
    let local: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        Box::new(AUTH_FAILURES_TOTAL.clone()),
        Box::new(CATALOG_TITLES.clone()),
        Box::new(CATALOG_DOWNLOADS.clone()),
        Box::new(TOKENS_STORED.clone()),
        Box::new(TOKEN_SWEEPER_RUNNING.clone()),
        Box::new(REQUESTS_PENDING.clone()),
        Box::new(DIRECTORY_USERS.clone()),
    ];

    for metric in local.into_iter().chain(moviezone_core::metrics::all_metrics()) {
        if let Err(e) = registry.register(metric) {
            warn!("Failed to register metric: {}", e);
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Refresh gauges from current application state before encoding.
pub fn collect_dynamic_metrics(state: &AppState) {
    if let Ok(stats) = state.catalog().stats() {
        CATALOG_TITLES.set(stats.total_titles as i64);
        CATALOG_DOWNLOADS.set(stats.total_downloads as i64);
    }

    if let Ok(count) = state.gateway().store().count() {
        TOKENS_STORED.set(count as i64);
    }

    TOKEN_SWEEPER_RUNNING.set(i64::from(state.sweeper().is_running()));

    if let Ok(pending) = state.requests().pending(PENDING_SCAN_LIMIT) {
        REQUESTS_PENDING.set(pending.len() as i64);
    }

    if let Ok(users) = state.directory().user_count() {
        DIRECTORY_USERS.set(users as i64);
    }
}

static TOKEN_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[0-9a-fA-F]{16,64}(/|$)").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/-?\d+(/|$)").unwrap());
static START_PAYLOAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"/start/[^/]+$").unwrap());
static FILE_QUALITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"/files/[^/]+$").unwrap());
static TITLE_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"/letter/[^/]+$").unwrap());
static DIRECTORY_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(admins|channels)/[^/]+$").unwrap());

/// Collapse ids, tokens and caller-chosen segments (deep-link payloads,
/// qualities, letters, admin and channel names) so metric labels stay
/// bounded.
pub fn normalize_path(path: &str) -> String {
    let result = START_PAYLOAD.replace(path, "/start/{payload}");
    let result = FILE_QUALITY.replace(&result, "/files/{quality}");
    let result = TITLE_LETTER.replace(&result, "/letter/{letter}");
    let result = DIRECTORY_ENTRY.replace(&result, "/${1}/{identifier}");
    let result = TOKEN_SEGMENT.replace_all(&result, "/{token}$1");
    // Run twice: adjacent numeric segments share a slash, so one pass skips
    // every other one.
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
