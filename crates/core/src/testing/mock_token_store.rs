//! Mock token store for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::injected_failure;
use crate::tokens::{ConsumeOutcome, TokenError, TokenRecord, TokenStore};

/// Token store wrapper that can fail writes on demand.
pub struct MockTokenStore {
    inner: Arc<dyn TokenStore>,
    fail_inserts: AtomicBool,
    fail_consumes: AtomicBool,
}

impl std::fmt::Debug for MockTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTokenStore")
            .field("inner", &"<store>")
            .field("fail_inserts", &self.fail_inserts)
            .field("fail_consumes", &self.fail_consumes)
            .finish()
    }
}

impl MockTokenStore {
    pub fn wrap(inner: Arc<dyn TokenStore>) -> Self {
        Self {
            inner,
            fail_inserts: AtomicBool::new(false),
            fail_consumes: AtomicBool::new(false),
        }
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_consumes(&self, fail: bool) {
        self.fail_consumes.store(fail, Ordering::SeqCst);
    }
}

impl TokenStore for MockTokenStore {
    fn insert(&self, token: &str, record: TokenRecord) -> Result<(), TokenError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected_failure("insert").into());
        }
        self.inner.insert(token, record)
    }

    fn get(&self, token: &str) -> Result<Option<TokenRecord>, TokenError> {
        self.inner.get(token)
    }

    fn consume(
        &self,
        token: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, TokenError> {
        if self.fail_consumes.load(Ordering::SeqCst) {
            return Err(injected_failure("consume").into());
        }
        self.inner.consume(token, user_id, now)
    }

    fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, TokenError> {
        self.inner.remove_expired(now)
    }

    fn count(&self) -> Result<usize, TokenError> {
        self.inner.count()
    }
}
