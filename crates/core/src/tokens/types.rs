//! Access token records and redemption outcomes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// A stored access token.
///
/// The file reference is captured when the token is issued and never
/// re-resolved, so later catalog edits do not change what a token delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_id: i64,
    #[serde(rename = "movie_id")]
    pub title_id: u64,
    pub quality: String,
    pub file_id: String,
    #[serde(deserialize_with = "crate::storage::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "crate::storage::timestamp::deserialize")]
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub used: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::storage::timestamp::optional"
    )]
    pub used_at: Option<DateTime<Utc>>,
}

/// What a redeem attempt by `user_id` at `now` would do to a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Redeemable,
    WrongOwner,
    Expired,
    AlreadyUsed,
}

impl TokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Checks run in a fixed order: owner, then expiry, then single use.
    ///
    /// A wrong owner never consumes or purges the token, even one that has
    /// expired.
    pub fn verdict(&self, user_id: i64, now: DateTime<Utc>) -> Verdict {
        if self.user_id != user_id {
            Verdict::WrongOwner
        } else if self.is_expired_at(now) {
            Verdict::Expired
        } else if self.used {
            Verdict::AlreadyUsed
        } else {
            Verdict::Redeemable
        }
    }
}

/// Result of [`super::TokenStore::consume`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// Token was valid and is now marked used. Carries the updated record.
    Redeemed(TokenRecord),
    Unknown,
    WrongOwner,
    /// Token had expired and has been deleted.
    Expired,
    AlreadyUsed,
}

impl ConsumeOutcome {
    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ConsumeOutcome::Redeemed(_) => "redeemed",
            ConsumeOutcome::Unknown => "unknown",
            ConsumeOutcome::WrongOwner => "wrong_owner",
            ConsumeOutcome::Expired => "expired",
            ConsumeOutcome::AlreadyUsed => "already_used",
        }
    }
}

/// On-disk layout of `tokens.json`.
pub type TokenCollection = BTreeMap<String, TokenRecord>;

/// What a successful redemption hands to the delivery layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub file_id: String,
    pub title_id: u64,
    pub quality: String,
}

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Errors for token storage.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(user_id: i64, used: bool) -> (TokenRecord, DateTime<Utc>) {
        let now = Utc::now();
        (
            TokenRecord {
                user_id,
                title_id: 7,
                quality: "720p".to_string(),
                file_id: "fileA".to_string(),
                created_at: now,
                expires_at: now + Duration::hours(24),
                used,
                used_at: None,
            },
            now,
        )
    }

    #[test]
    fn test_verdict_redeemable() {
        let (token, now) = record(42, false);
        assert_eq!(token.verdict(42, now), Verdict::Redeemable);
    }

    #[test]
    fn test_verdict_wrong_owner_checked_before_expiry() {
        let (token, now) = record(42, false);
        let later = now + Duration::hours(25);
        assert_eq!(token.verdict(7, later), Verdict::WrongOwner);
    }

    #[test]
    fn test_verdict_expired_checked_before_used() {
        let (token, now) = record(42, true);
        assert_eq!(token.verdict(42, now + Duration::hours(25)), Verdict::Expired);
        assert_eq!(token.verdict(42, now), Verdict::AlreadyUsed);
    }

    #[test]
    fn test_expiry_is_strictly_after() {
        let (token, _) = record(42, false);
        assert!(!token.is_expired_at(token.expires_at));
        assert!(token.is_expired_at(token.expires_at + Duration::milliseconds(1)));
    }

    #[test]
    fn test_token_record_layout() {
        let (token, _) = record(42, false);
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["movie_id"], 7);
        assert_eq!(value["used"], false);
        assert!(value.get("used_at").is_none());
    }
}
