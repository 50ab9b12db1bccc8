//! Issue and redeem download tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info, warn};

use super::{ConsumeOutcome, IssuedToken, Redemption, TokenError, TokenRecord, TokenStore};
use crate::catalog::{CatalogError, TitleCatalog};
use crate::config::TokenConfig;
use crate::metrics;

/// Why an issue or redeem attempt did not succeed.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Unknown title, unknown quality, or unknown token.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Token belongs to another user")]
    OwnershipMismatch,

    #[error("Token already used")]
    AlreadyUsed,

    #[error("Token expired")]
    Expired,

    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Settings that cannot produce a valid token, such as a TTL past the
    /// end of the representable calendar.
    #[error("Token settings invalid: {0}")]
    Misconfigured(String),
}

impl From<TokenError> for GatewayError {
    fn from(e: TokenError) -> Self {
        GatewayError::Persistence(e.to_string())
    }
}

impl From<CatalogError> for GatewayError {
    fn from(e: CatalogError) -> Self {
        GatewayError::Persistence(e.to_string())
    }
}

/// Token derivation and lifetime.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub ttl: Duration,
    /// Hex characters kept from the SHA-256 digest (at most 64).
    pub token_length: usize,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: uuid::Uuid::new_v4().to_string(),
            ttl: Duration::hours(24),
            token_length: 32,
        }
    }
}

impl TokenSettings {
    /// Build settings from config. A missing secret is replaced by a random
    /// one for the lifetime of this process.
    pub fn from_config(config: &TokenConfig) -> Self {
        let secret = match &config.secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("tokens.secret is not set; using a random secret, tokens will not survive a restart");
                uuid::Uuid::new_v4().to_string()
            }
        };

        Self {
            secret,
            ttl: Duration::hours(i64::from(config.ttl_hours)),
            token_length: config.token_length,
        }
    }
}

/// Grants and checks single-use, expiring access to one file of one title.
pub struct TokenGateway {
    catalog: Arc<dyn TitleCatalog>,
    store: Arc<dyn TokenStore>,
    settings: TokenSettings,
}

impl TokenGateway {
    pub fn new(
        catalog: Arc<dyn TitleCatalog>,
        store: Arc<dyn TokenStore>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            catalog,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Issue a token for `user_id` to fetch `quality` of `title_id`.
    pub fn issue(
        &self,
        user_id: i64,
        title_id: u64,
        quality: &str,
    ) -> Result<IssuedToken, GatewayError> {
        self.issue_at(user_id, title_id, quality, Utc::now())
    }

    /// [`Self::issue`] with an explicit clock.
    ///
    /// The file handle is resolved here and frozen into the token record.
    pub fn issue_at(
        &self,
        user_id: i64,
        title_id: u64,
        quality: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, GatewayError> {
        let title = self.catalog.get_title(title_id)?.ok_or_else(|| {
            GatewayError::NotFound(format!("title {}", title_id))
        })?;
        let variant = title.files.get(quality).ok_or_else(|| {
            GatewayError::NotFound(format!("quality {} of title {}", quality, title_id))
        })?;

        let expires_at = now.checked_add_signed(self.settings.ttl).ok_or_else(|| {
            GatewayError::Misconfigured(format!(
                "ttl of {} hours overflows from {}",
                self.settings.ttl.num_hours(),
                now
            ))
        })?;
        let token = self.derive_token(user_id, title_id, quality, now);
        let record = TokenRecord {
            user_id,
            title_id,
            quality: quality.to_string(),
            file_id: variant.file_id.clone(),
            created_at: now,
            expires_at,
            used: false,
            used_at: None,
        };

        self.store.insert(&token, record)?;
        metrics::TOKENS_ISSUED.inc();
        info!(
            "Issued token {} for user {} (title {}, {})",
            short(&token),
            user_id,
            title_id,
            quality
        );

        Ok(IssuedToken { token, expires_at })
    }

    /// Redeem `token` on behalf of `user_id`.
    pub fn redeem(&self, token: &str, user_id: i64) -> Result<Redemption, GatewayError> {
        self.redeem_at(token, user_id, Utc::now())
    }

    /// [`Self::redeem`] with an explicit clock.
    ///
    /// On success the title's download counter is bumped. A failure to bump
    /// it is logged and does not undo the redemption.
    pub fn redeem_at(
        &self,
        token: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Redemption, GatewayError> {
        let outcome = match self.store.consume(token, user_id, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics::TOKEN_REDEMPTIONS.with_label_values(&["error"]).inc();
                error!("Failed to redeem token {}: {}", short(token), e);
                return Err(e.into());
            }
        };
        metrics::TOKEN_REDEMPTIONS
            .with_label_values(&[outcome.label()])
            .inc();

        let record = match outcome {
            ConsumeOutcome::Redeemed(record) => record,
            ConsumeOutcome::Unknown => {
                warn!("Unknown token {} presented by user {}", short(token), user_id);
                return Err(GatewayError::NotFound(format!("token {}", short(token))));
            }
            ConsumeOutcome::WrongOwner => {
                warn!("Token {} presented by non-owner {}", short(token), user_id);
                return Err(GatewayError::OwnershipMismatch);
            }
            ConsumeOutcome::Expired => {
                warn!("Token {} expired, removed", short(token));
                return Err(GatewayError::Expired);
            }
            ConsumeOutcome::AlreadyUsed => {
                warn!("Token {} already used", short(token));
                return Err(GatewayError::AlreadyUsed);
            }
        };

        match self.catalog.increment_download_count(record.title_id) {
            Ok(true) => {}
            Ok(false) => warn!(
                "Title {} no longer exists; delivering frozen file for token {}",
                record.title_id,
                short(token)
            ),
            Err(e) => error!(
                "Failed to count download of title {}: {}",
                record.title_id, e
            ),
        }

        info!(
            "Redeemed token {} for user {} (title {}, {})",
            short(token),
            user_id,
            record.title_id,
            record.quality
        );

        Ok(Redemption {
            file_id: record.file_id,
            title_id: record.title_id,
            quality: record.quality,
        })
    }

    /// Remove every expired token.
    pub fn sweep_expired(&self) -> Result<usize, GatewayError> {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<usize, GatewayError> {
        let removed = self.store.remove_expired(now)?;
        if removed > 0 {
            metrics::TOKENS_SWEPT.inc_by(removed as u64);
            info!("Swept {} expired tokens", removed);
        }
        Ok(removed)
    }

    /// Issue a token, or `None` if the title or quality is unknown or the
    /// token could not be stored.
    pub fn issue_download_token(&self, user_id: i64, title_id: u64, quality: &str) -> Option<String> {
        match self.issue(user_id, title_id, quality) {
            Ok(issued) => Some(issued.token),
            Err(e) => {
                log_issue_failure(user_id, title_id, quality, &e);
                None
            }
        }
    }

    /// Redeem a token and return the file handle, or `None` on any failure.
    ///
    /// Callers cannot tell the failure reasons apart.
    pub fn redeem_download_token(&self, token: &str, user_id: i64) -> Option<String> {
        self.redeem(token, user_id).ok().map(|r| r.file_id)
    }

    fn derive_token(&self, user_id: i64, title_id: u64, quality: &str, now: DateTime<Utc>) -> String {
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000));

        // Fields are `_`-joined so (1, 23) and (12, 3) hash differently.
        let mut hasher = Sha256::new();
        hasher.update(self.settings.secret.as_bytes());
        hasher.update(format!("_{}_{}_{}_{}", user_id, title_id, quality, nanos).as_bytes());

        let mut token = format!("{:x}", hasher.finalize());
        token.truncate(self.settings.token_length.min(64));
        token
    }
}

/// Records a failed issue attempt. Shared by every caller that turns
/// gateway errors into `None`.
pub(crate) fn log_issue_failure(user_id: i64, title_id: u64, quality: &str, e: &GatewayError) {
    match e {
        GatewayError::NotFound(what) => {
            metrics::TOKEN_ISSUE_FAILURES
                .with_label_values(&["not_found"])
                .inc();
            warn!(
                "Cannot issue token for user {} (title {}, {}): {} not found",
                user_id, title_id, quality, what
            );
        }
        other => {
            metrics::TOKEN_ISSUE_FAILURES
                .with_label_values(&["error"])
                .inc();
            error!(
                "Cannot issue token for user {} (title {}, {}): {}",
                user_id, title_id, quality, other
            );
        }
    }
}

/// First 8 characters, enough to correlate log lines.
fn short(token: &str) -> &str {
    match token.char_indices().nth(8) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FileVariant, JsonCatalog};
    use crate::testing::{fixtures, MockCatalog, MockTokenStore};
    use crate::tokens::JsonTokenStore;
    use tempfile::TempDir;

    struct Harness {
        catalog: Arc<MockCatalog>,
        store: Arc<MockTokenStore>,
        gateway: TokenGateway,
        _dir: TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(MockCatalog::wrap(Arc::new(
            JsonCatalog::open(&dir.path().join("movies.json")).unwrap(),
        )));
        let store = Arc::new(MockTokenStore::wrap(Arc::new(
            JsonTokenStore::open(&dir.path().join("tokens.json")).unwrap(),
        )));
        let settings = TokenSettings {
            secret: "test-secret".to_string(),
            ..Default::default()
        };
        let gateway = TokenGateway::new(catalog.clone(), store.clone(), settings);
        Harness {
            catalog,
            store,
            gateway,
            _dir: dir,
        }
    }

    #[test]
    fn test_issue_creates_record() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let now = Utc::now();

        let issued = h.gateway.issue_at(42, id, "720p", now).unwrap();

        assert_eq!(issued.token.len(), 32);
        assert!(issued.token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(issued.expires_at, now + Duration::hours(24));

        let record = h.store.get(&issued.token).unwrap().unwrap();
        assert_eq!(record.user_id, 42);
        assert_eq!(record.title_id, id);
        assert_eq!(record.file_id, "Jawan-720p");
        assert!(!record.used);
    }

    #[test]
    fn test_issue_unknown_title_or_quality() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();

        assert!(matches!(
            h.gateway.issue(42, 999, "720p"),
            Err(GatewayError::NotFound(_))
        ));
        assert!(matches!(
            h.gateway.issue(42, id, "4K"),
            Err(GatewayError::NotFound(_))
        ));
        assert_eq!(h.store.count().unwrap(), 0);
        assert!(h.gateway.issue_download_token(42, id, "4K").is_none());
    }

    #[test]
    fn test_issue_with_overflowing_ttl_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(JsonCatalog::open(&dir.path().join("movies.json")).unwrap());
        let store = Arc::new(JsonTokenStore::open(&dir.path().join("tokens.json")).unwrap());
        let id = catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let gateway = TokenGateway::new(
            catalog,
            store.clone(),
            TokenSettings {
                ttl: Duration::days(365 * 1_000_000),
                ..Default::default()
            },
        );

        assert!(matches!(
            gateway.issue(42, id, "720p"),
            Err(GatewayError::Misconfigured(_))
        ));
        assert!(gateway.issue_download_token(42, id, "720p").is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_token_fields_do_not_run_together() {
        let h = harness();
        let now = Utc::now();

        assert_ne!(
            h.gateway.derive_token(1, 23, "720p", now),
            h.gateway.derive_token(12, 3, "720p", now)
        );
        assert_ne!(
            h.gateway.derive_token(1, 2, "3720p", now),
            h.gateway.derive_token(1, 23, "720p", now)
        );
    }

    #[test]
    fn test_issue_persistence_failure() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        h.store.fail_inserts(true);

        assert!(matches!(
            h.gateway.issue(42, id, "720p"),
            Err(GatewayError::Persistence(_))
        ));
        assert!(h.gateway.issue_download_token(42, id, "720p").is_none());
    }

    #[test]
    fn test_distinct_tokens_for_distinct_issuance() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let now = Utc::now();

        let a = h.gateway.issue_at(42, id, "720p", now).unwrap();
        let b = h
            .gateway
            .issue_at(42, id, "720p", now + Duration::nanoseconds(1))
            .unwrap();
        let c = h.gateway.issue_at(43, id, "720p", now).unwrap();

        assert_ne!(a.token, b.token);
        assert_ne!(a.token, c.token);
        assert_eq!(h.store.count().unwrap(), 3);
    }

    #[test]
    fn test_token_length_setting() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(JsonCatalog::open(&dir.path().join("movies.json")).unwrap());
        let store = Arc::new(JsonTokenStore::open(&dir.path().join("tokens.json")).unwrap());
        let id = catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let gateway = TokenGateway::new(
            catalog,
            store,
            TokenSettings {
                token_length: 64,
                ..Default::default()
            },
        );

        assert_eq!(gateway.issue(1, id, "480p").unwrap().token.len(), 64);
    }

    #[test]
    fn test_redeem_success_increments_counter() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let token = h.gateway.issue_download_token(42, id, "720p").unwrap();

        let redemption = h.gateway.redeem(&token, 42).unwrap();

        assert_eq!(redemption.file_id, "Jawan-720p");
        assert_eq!(redemption.title_id, id);
        assert_eq!(redemption.quality, "720p");
        assert_eq!(h.catalog.get_title(id).unwrap().unwrap().download_count, 1);
    }

    #[test]
    fn test_redeem_twice_fails() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let token = h.gateway.issue_download_token(42, id, "720p").unwrap();

        assert!(h.gateway.redeem_download_token(&token, 42).is_some());
        assert!(matches!(
            h.gateway.redeem(&token, 42),
            Err(GatewayError::AlreadyUsed)
        ));
        assert_eq!(h.catalog.get_title(id).unwrap().unwrap().download_count, 1);
    }

    #[test]
    fn test_redeem_wrong_owner_keeps_token_usable() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let token = h.gateway.issue_download_token(42, id, "720p").unwrap();

        assert!(matches!(
            h.gateway.redeem(&token, 7),
            Err(GatewayError::OwnershipMismatch)
        ));
        assert!(h.gateway.redeem(&token, 42).is_ok());
    }

    #[test]
    fn test_redeem_expired_removes_token() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let now = Utc::now();
        let issued = h.gateway.issue_at(42, id, "720p", now).unwrap();

        let later = now + Duration::hours(24) + Duration::seconds(1);
        assert!(matches!(
            h.gateway.redeem_at(&issued.token, 42, later),
            Err(GatewayError::Expired)
        ));
        assert!(h.store.get(&issued.token).unwrap().is_none());
        assert!(matches!(
            h.gateway.redeem_at(&issued.token, 42, later),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[test]
    fn test_redeem_at_exact_expiry_succeeds() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let now = Utc::now();
        let issued = h.gateway.issue_at(42, id, "720p", now).unwrap();

        assert!(h
            .gateway
            .redeem_at(&issued.token, 42, issued.expires_at)
            .is_ok());
    }

    #[test]
    fn test_redeem_unknown_token() {
        let h = harness();
        assert!(matches!(
            h.gateway.redeem("deadbeef", 42),
            Err(GatewayError::NotFound(_))
        ));
        assert!(h.gateway.redeem_download_token("", 42).is_none());
    }

    #[test]
    fn test_redeem_delivers_frozen_file() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let token = h.gateway.issue_download_token(42, id, "720p").unwrap();

        h.catalog
            .update_file(id, "720p", FileVariant::new("replaced"))
            .unwrap();

        assert_eq!(
            h.gateway.redeem_download_token(&token, 42).as_deref(),
            Some("Jawan-720p")
        );
    }

    #[test]
    fn test_redeem_after_title_deleted() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let token = h.gateway.issue_download_token(42, id, "480p").unwrap();
        h.catalog.delete_title(id).unwrap();

        assert_eq!(
            h.gateway.redeem_download_token(&token, 42).as_deref(),
            Some("Jawan-480p")
        );
    }

    #[test]
    fn test_redeem_survives_counter_failure() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let token = h.gateway.issue_download_token(42, id, "720p").unwrap();
        h.catalog.fail_increments(true);

        assert!(h.gateway.redeem(&token, 42).is_ok());
        assert_eq!(h.catalog.increment_calls(), 1);
        assert_eq!(h.catalog.get_title(id).unwrap().unwrap().download_count, 0);
        assert!(h.store.get(&token).unwrap().unwrap().used);
    }

    #[test]
    fn test_redeem_persistence_failure() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let token = h.gateway.issue_download_token(42, id, "720p").unwrap();
        h.store.fail_consumes(true);

        assert!(matches!(
            h.gateway.redeem(&token, 42),
            Err(GatewayError::Persistence(_))
        ));

        h.store.fail_consumes(false);
        assert!(h.gateway.redeem(&token, 42).is_ok());
    }

    #[test]
    fn test_sweep_expired() {
        let h = harness();
        let id = h.catalog.add_title(fixtures::movie("Jawan", 1)).unwrap();
        let now = Utc::now();
        h.gateway.issue_at(1, id, "720p", now - Duration::hours(30)).unwrap();
        h.gateway.issue_at(2, id, "720p", now).unwrap();

        assert_eq!(h.gateway.sweep_expired_at(now).unwrap(), 1);
        assert_eq!(h.store.count().unwrap(), 1);
    }

    #[test]
    fn test_from_config_keeps_secret() {
        let config = TokenConfig {
            secret: Some("abc".to_string()),
            ttl_hours: 2,
            ..Default::default()
        };
        let settings = TokenSettings::from_config(&config);
        assert_eq!(settings.secret, "abc");
        assert_eq!(settings.ttl, Duration::hours(2));
        assert_eq!(settings.token_length, 32);
    }

    #[test]
    fn test_from_config_random_secret() {
        let a = TokenSettings::from_config(&TokenConfig::default());
        let b = TokenSettings::from_config(&TokenConfig::default());
        assert!(!a.secret.is_empty());
        assert_ne!(a.secret, b.secret);
    }

    #[test]
    fn test_short_prefix() {
        assert_eq!(short("0123456789abcdef"), "01234567");
        assert_eq!(short("abc"), "abc");
    }
}
