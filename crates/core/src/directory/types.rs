use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// Who a Telegram user is to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    User,
}

impl Role {
    /// Owners and admins may add and remove titles and triage requests.
    pub fn can_manage_catalog(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// Anyone who has talked to the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(deserialize_with = "crate::storage::timestamp::deserialize")]
    pub joined_at: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub user_id: i64,
    pub short_name: String,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(deserialize_with = "crate::storage::timestamp::deserialize")]
    pub added_at: DateTime<Utc>,
}

/// A channel new titles are announced in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel_id: String,
    pub channel_name: String,
    pub short_name: String,
    #[serde(deserialize_with = "crate::storage::timestamp::deserialize")]
    pub added_at: DateTime<Utc>,
}

/// Input for [`super::Directory::add_admin`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdmin {
    pub user_id: i64,
    pub short_name: String,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Input for [`super::Directory::add_channel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChannel {
    pub channel_id: String,
    pub channel_name: String,
    pub short_name: String,
}

/// `users.json`, keyed by user id.
pub type UserCollection = BTreeMap<i64, UserRecord>;
/// `admins.json`, keyed by user id.
pub type AdminCollection = BTreeMap<i64, AdminRecord>;
/// `channels.json`, keyed by channel id.
pub type ChannelCollection = BTreeMap<String, ChannelRecord>;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
