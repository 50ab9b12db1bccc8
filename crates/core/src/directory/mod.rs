//! Users, admins and broadcast channels.

mod types;

pub use types::*;

use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::storage::{Change, JsonCollection};

/// Reference data about the people and channels around the catalog.
pub struct Directory {
    owner_id: i64,
    users: JsonCollection<UserCollection>,
    admins: JsonCollection<AdminCollection>,
    channels: JsonCollection<ChannelCollection>,
}

impl Directory {
    pub fn open(
        owner_id: i64,
        users_path: &Path,
        admins_path: &Path,
        channels_path: &Path,
    ) -> Result<Self, DirectoryError> {
        Ok(Self {
            owner_id,
            users: JsonCollection::open(users_path)?,
            admins: JsonCollection::open(admins_path)?,
            channels: JsonCollection::open(channels_path)?,
        })
    }

    /// Open the three collections under the configured data directory.
    pub fn open_in(owner_id: i64, storage: &StorageConfig) -> Result<Self, DirectoryError> {
        Self::open(
            owner_id,
            &storage.users_path(),
            &storage.admins_path(),
            &storage.channels_path(),
        )
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Record a user. Returns true when the user is new.
    ///
    /// Known users are rewritten only if their name or username changed.
    pub fn upsert_user(
        &self,
        user_id: i64,
        first_name: &str,
        username: Option<&str>,
    ) -> Result<bool, DirectoryError> {
        let added = self.users.write(|users| match users.get_mut(&user_id) {
            None => {
                users.insert(
                    user_id,
                    UserRecord {
                        user_id,
                        first_name: first_name.to_string(),
                        username: username.map(String::from),
                        joined_at: Utc::now(),
                        is_active: true,
                    },
                );
                Change::Persist(true)
            }
            Some(user) => {
                let unchanged =
                    user.first_name == first_name && user.username.as_deref() == username;
                if unchanged {
                    return Change::Discard(false);
                }
                user.first_name = first_name.to_string();
                user.username = username.map(String::from);
                Change::Persist(false)
            }
        })?;

        if added {
            info!("Added new user: {} ({})", user_id, first_name);
        }
        Ok(added)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.users.read(|users| users.get(&user_id).cloned())?)
    }

    pub fn user_count(&self) -> Result<usize, DirectoryError> {
        Ok(self.users.read(|users| users.len())?)
    }

    pub fn role_of(&self, user_id: i64) -> Result<Role, DirectoryError> {
        if self.owner_id != 0 && user_id == self.owner_id {
            return Ok(Role::Owner);
        }
        let is_admin = self.admins.read(|admins| admins.contains_key(&user_id))?;
        Ok(if is_admin { Role::Admin } else { Role::User })
    }

    // =========================================================================
    // Admins
    // =========================================================================

    /// Returns false if the user is already an admin.
    pub fn add_admin(&self, admin: NewAdmin) -> Result<bool, DirectoryError> {
        let user_id = admin.user_id;
        let short_name = admin.short_name.clone();
        let added = self.admins.write(|admins| {
            if admins.contains_key(&admin.user_id) {
                return Change::Discard(false);
            }
            admins.insert(
                admin.user_id,
                AdminRecord {
                    user_id: admin.user_id,
                    short_name: admin.short_name,
                    first_name: admin.first_name,
                    username: admin.username,
                    added_at: Utc::now(),
                },
            );
            Change::Persist(true)
        })?;

        if added {
            info!("Added new admin: {} ({})", user_id, short_name);
        } else {
            warn!("Admin {} already exists", user_id);
        }
        Ok(added)
    }

    /// Remove an admin by user id or, failing that, by short name.
    pub fn remove_admin(&self, identifier: &str) -> Result<bool, DirectoryError> {
        let by_id = identifier.trim().parse::<i64>().ok();
        let removed = self.admins.write(|admins| {
            let key = by_id
                .filter(|id| admins.contains_key(id))
                .or_else(|| {
                    admins
                        .values()
                        .find(|a| a.short_name == identifier)
                        .map(|a| a.user_id)
                });
            match key {
                Some(key) => {
                    admins.remove(&key);
                    Change::Persist(true)
                }
                None => Change::Discard(false),
            }
        })?;

        if removed {
            info!("Removed admin: {}", identifier);
        } else {
            warn!("Admin not found: {}", identifier);
        }
        Ok(removed)
    }

    pub fn admins(&self) -> Result<Vec<AdminRecord>, DirectoryError> {
        Ok(self.admins.read(|admins| admins.values().cloned().collect())?)
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Returns false if the channel is already registered.
    pub fn add_channel(&self, channel: NewChannel) -> Result<bool, DirectoryError> {
        let channel_id = channel.channel_id.clone();
        let short_name = channel.short_name.clone();
        let added = self.channels.write(|channels| {
            if channels.contains_key(&channel.channel_id) {
                return Change::Discard(false);
            }
            channels.insert(
                channel.channel_id.clone(),
                ChannelRecord {
                    channel_id: channel.channel_id,
                    channel_name: channel.channel_name,
                    short_name: channel.short_name,
                    added_at: Utc::now(),
                },
            );
            Change::Persist(true)
        })?;

        if added {
            info!("Added new channel: {} ({})", channel_id, short_name);
        } else {
            warn!("Channel {} already exists", channel_id);
        }
        Ok(added)
    }

    /// Remove a channel by channel id or, failing that, by short name.
    pub fn remove_channel(&self, identifier: &str) -> Result<bool, DirectoryError> {
        let removed = self.channels.write(|channels| {
            let key = if channels.contains_key(identifier) {
                Some(identifier.to_string())
            } else {
                channels
                    .values()
                    .find(|c| c.short_name == identifier)
                    .map(|c| c.channel_id.clone())
            };
            match key {
                Some(key) => {
                    channels.remove(&key);
                    Change::Persist(true)
                }
                None => Change::Discard(false),
            }
        })?;

        if removed {
            info!("Removed channel: {}", identifier);
        } else {
            warn!("Channel not found: {}", identifier);
        }
        Ok(removed)
    }

    pub fn channels(&self) -> Result<Vec<ChannelRecord>, DirectoryError> {
        Ok(self.channels.read(|channels| channels.values().cloned().collect())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OWNER: i64 = 1000;

    fn create_test_directory() -> (Directory, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let directory = Directory::open_in(OWNER, &storage).unwrap();
        (directory, dir)
    }

    fn admin(user_id: i64, short_name: &str) -> NewAdmin {
        NewAdmin {
            user_id,
            short_name: short_name.to_string(),
            first_name: format!("Admin {}", user_id),
            username: None,
        }
    }

    fn channel(id: &str, short_name: &str) -> NewChannel {
        NewChannel {
            channel_id: id.to_string(),
            channel_name: format!("Channel {}", short_name),
            short_name: short_name.to_string(),
        }
    }

    #[test]
    fn test_upsert_user() {
        let (directory, _dir) = create_test_directory();

        assert!(directory.upsert_user(1, "Rahul", Some("rahul")).unwrap());
        assert!(!directory.upsert_user(1, "Rahul", Some("rahul")).unwrap());
        assert!(!directory.upsert_user(1, "Rahul K", None).unwrap());

        let user = directory.get_user(1).unwrap().unwrap();
        assert_eq!(user.first_name, "Rahul K");
        assert!(user.username.is_none());
        assert!(user.is_active);
        assert_eq!(directory.user_count().unwrap(), 1);
    }

    #[test]
    fn test_unchanged_user_is_not_rewritten() {
        let (directory, dir) = create_test_directory();
        directory.upsert_user(1, "Rahul", None).unwrap();
        let path = dir.path().join("users.json");
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        directory.upsert_user(1, "Rahul", None).unwrap();

        let after = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_role_of() {
        let (directory, _dir) = create_test_directory();
        directory.add_admin(admin(7, "seven")).unwrap();

        assert_eq!(directory.role_of(OWNER).unwrap(), Role::Owner);
        assert_eq!(directory.role_of(7).unwrap(), Role::Admin);
        assert_eq!(directory.role_of(8).unwrap(), Role::User);
        assert!(Role::Admin.can_manage_catalog());
        assert!(!Role::User.can_manage_catalog());
    }

    #[test]
    fn test_owner_zero_means_nobody() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let directory = Directory::open_in(0, &storage).unwrap();
        assert_eq!(directory.role_of(0).unwrap(), Role::User);
    }

    #[test]
    fn test_admin_lifecycle() {
        let (directory, _dir) = create_test_directory();

        assert!(directory.add_admin(admin(7, "seven")).unwrap());
        assert!(!directory.add_admin(admin(7, "again")).unwrap());
        assert!(directory.add_admin(admin(8, "eight")).unwrap());
        assert_eq!(directory.admins().unwrap().len(), 2);

        assert!(directory.remove_admin("7").unwrap());
        assert!(directory.remove_admin("eight").unwrap());
        assert!(!directory.remove_admin("nobody").unwrap());
        assert!(directory.admins().unwrap().is_empty());
    }

    #[test]
    fn test_channel_lifecycle() {
        let (directory, _dir) = create_test_directory();

        assert!(directory.add_channel(channel("-1001", "main")).unwrap());
        assert!(!directory.add_channel(channel("-1001", "dup")).unwrap());
        assert!(directory.add_channel(channel("@movies", "pub")).unwrap());

        assert!(directory.remove_channel("-1001").unwrap());
        assert!(directory.remove_channel("pub").unwrap());
        assert!(!directory.remove_channel("main").unwrap());
        assert!(directory.channels().unwrap().is_empty());
    }

    #[test]
    fn test_directory_persists() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        {
            let directory = Directory::open_in(OWNER, &storage).unwrap();
            directory.upsert_user(1, "Rahul", None).unwrap();
            directory.add_admin(admin(7, "seven")).unwrap();
            directory.add_channel(channel("-1001", "main")).unwrap();
        }

        let directory = Directory::open_in(OWNER, &storage).unwrap();
        assert!(directory.get_user(1).unwrap().is_some());
        assert_eq!(directory.role_of(7).unwrap(), Role::Admin);
        assert_eq!(directory.channels().unwrap().len(), 1);
    }
}
