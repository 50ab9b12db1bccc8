//! JSON-file-backed token store (`tokens.json`).

use std::path::Path;

use chrono::{DateTime, Utc};

use super::{ConsumeOutcome, TokenCollection, TokenError, TokenRecord, TokenStore, Verdict};
use crate::storage::{Change, JsonCollection};

/// Token store persisted as a single JSON object keyed by token.
///
/// Every `consume` runs under the collection mutex, which makes the
/// check-then-mark sequence atomic within this process.
pub struct JsonTokenStore {
    collection: JsonCollection<TokenCollection>,
}

impl JsonTokenStore {
    pub fn open(path: &Path) -> Result<Self, TokenError> {
        Ok(Self {
            collection: JsonCollection::open(path)?,
        })
    }
}

impl TokenStore for JsonTokenStore {
    fn insert(&self, token: &str, record: TokenRecord) -> Result<(), TokenError> {
        self.collection.write(|tokens| {
            tokens.insert(token.to_string(), record);
            Change::Persist(())
        })?;
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<TokenRecord>, TokenError> {
        Ok(self.collection.read(|tokens| tokens.get(token).cloned())?)
    }

    fn consume(
        &self,
        token: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, TokenError> {
        let outcome = self.collection.write(|tokens| {
            let Some(record) = tokens.get_mut(token) else {
                return Change::Discard(ConsumeOutcome::Unknown);
            };

            match record.verdict(user_id, now) {
                Verdict::WrongOwner => Change::Discard(ConsumeOutcome::WrongOwner),
                Verdict::AlreadyUsed => Change::Discard(ConsumeOutcome::AlreadyUsed),
                Verdict::Expired => {
                    tokens.remove(token);
                    Change::Persist(ConsumeOutcome::Expired)
                }
                Verdict::Redeemable => {
                    record.used = true;
                    record.used_at = Some(now);
                    Change::Persist(ConsumeOutcome::Redeemed(record.clone()))
                }
            }
        })?;
        Ok(outcome)
    }

    fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, TokenError> {
        let removed = self.collection.write(|tokens| {
            let before = tokens.len();
            tokens.retain(|_, record| !record.is_expired_at(now));
            let removed = before - tokens.len();
            if removed > 0 {
                Change::Persist(removed)
            } else {
                Change::Discard(0)
            }
        })?;
        Ok(removed)
    }

    fn count(&self) -> Result<usize, TokenError> {
        Ok(self.collection.read(|tokens| tokens.len())?)
    }
}
