use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// Lifecycle of a title request. Only `Pending` may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Deleted,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's request for a title not yet in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(rename = "request_id")]
    pub id: u64,
    pub user_id: i64,
    #[serde(rename = "movie_name")]
    pub title: String,
    pub status: RequestStatus,
    #[serde(
        rename = "requested_at",
        deserialize_with = "crate::storage::timestamp::deserialize"
    )]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::storage::timestamp::optional"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// On-disk layout of `requests.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestCollection {
    pub next_id: u64,
    pub requests: BTreeMap<u64, RequestRecord>,
}

impl Default for RequestCollection {
    fn default() -> Self {
        Self {
            next_id: 1,
            requests: BTreeMap::new(),
        }
    }
}

/// Errors for request operations.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Request not found: {0}")]
    NotFound(u64),

    #[error("Invalid state: request is {current}, cannot move to {requested}")]
    InvalidState {
        current: RequestStatus,
        requested: RequestStatus,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
