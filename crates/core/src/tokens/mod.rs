//! Token gateway - single-use, expiring access to catalog files.
//!
//! Per token: `ISSUED -> (REDEEMED | EXPIRED_PURGED)`, never back.

mod gateway;
mod json_store;
mod sqlite_store;
mod sweeper;
mod types;

pub use gateway::{GatewayError, TokenGateway, TokenSettings};
pub(crate) use gateway::log_issue_failure;
pub use json_store::JsonTokenStore;
pub use sqlite_store::SqliteTokenStore;
pub use sweeper::TokenSweeper;
pub use types::*;

use chrono::{DateTime, Utc};

/// Trait for token storage backends.
///
/// `consume` must evaluate and apply the redeem checks atomically for the
/// token it touches: two concurrent calls for the same token may produce at
/// most one [`ConsumeOutcome::Redeemed`].
pub trait TokenStore: Send + Sync {
    /// Store a token record under `token`.
    fn insert(&self, token: &str, record: TokenRecord) -> Result<(), TokenError>;

    /// Get a token record.
    fn get(&self, token: &str) -> Result<Option<TokenRecord>, TokenError>;

    /// Try to redeem `token` on behalf of `user_id`.
    ///
    /// Expired tokens are deleted as a side effect. Wrong-owner attempts
    /// leave the token untouched.
    fn consume(
        &self,
        token: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, TokenError>;

    /// Delete every token with `now > expires_at`. Returns how many were removed.
    fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, TokenError>;

    /// Number of stored tokens.
    fn count(&self) -> Result<usize, TokenError>;
}
