//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Token gateway (issuance, redemption outcomes, sweeps)
//! - Catalog mutations
//! - Title requests

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Token Gateway
// =============================================================================

/// Access tokens issued.
pub static TOKENS_ISSUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "moviezone_tokens_issued_total",
        "Total download tokens issued",
    )
    .unwrap()
});

/// Issue attempts refused (unknown title or quality, storage failure).
pub static TOKEN_ISSUE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "moviezone_token_issue_failures_total",
            "Token issue attempts that did not produce a token",
        ),
        &["reason"], // "not_found", "error"
    )
    .unwrap()
});

/// Redemption attempts by outcome.
pub static TOKEN_REDEMPTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "moviezone_token_redemptions_total",
            "Token redemption attempts by outcome",
        ),
        &["outcome"], // "redeemed", "unknown", "wrong_owner", "expired", "already_used", "error"
    )
    .unwrap()
});

/// Expired tokens removed by sweeps.
pub static TOKENS_SWEPT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "moviezone_tokens_swept_total",
        "Expired tokens removed by the periodic sweep",
    )
    .unwrap()
});

// =============================================================================
// Catalog
// =============================================================================

/// Catalog mutations by kind.
pub static CATALOG_MUTATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "moviezone_catalog_mutations_total",
            "Catalog mutations by kind",
        ),
        &["kind"], // "added", "deleted", "file_updated"
    )
    .unwrap()
});

// =============================================================================
// Requests
// =============================================================================

/// Title requests by resulting status.
pub static TITLE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("moviezone_title_requests_total", "Title requests by status"),
        &["status"], // "pending", "accepted", "deleted"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TOKENS_ISSUED.clone()),
        Box::new(TOKEN_ISSUE_FAILURES.clone()),
        Box::new(TOKEN_REDEMPTIONS.clone()),
        Box::new(TOKENS_SWEPT.clone()),
        Box::new(CATALOG_MUTATIONS.clone()),
        Box::new(TITLE_REQUESTS.clone()),
    ]
}
