//! Allow-list access control
//!
//! A persisted map of enrolled users plus a config-supplied admin set.
//! Admins are auto-enrolled when the list is first created and can never be
//! removed through [`AllowList::remove_user`].

use crate::storage::{Storage, StorageError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Storage key of the allow-list document (`users.json` on disk).
pub const USERS_KEY: &str = "users";

/// One enrolled user, keyed in the persisted map by stringified user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowListEntry {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub added: String,
}

impl AllowListEntry {
    fn now(username: &str, name: &str) -> Self {
        Self {
            username: username.to_string(),
            name: name.to_string(),
            added: Utc::now().format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Persisted user map, ordered for stable listings.
pub type UserMap = BTreeMap<String, AllowListEntry>;

/// Outcome of a removal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    /// Admin identities are never removable.
    Protected,
}

/// Allow-list gate over persisted users and configured admins.
#[derive(Clone)]
pub struct AllowList {
    storage: Storage,
    admin_ids: HashSet<i64>,
}

impl AllowList {
    #[must_use]
    pub fn new(storage: Storage, admin_ids: HashSet<i64>) -> Self {
        Self { storage, admin_ids }
    }

    /// Whether the user belongs to the configured admin set.
    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Whether the user is enrolled on the allow-list.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted list cannot be read.
    pub async fn is_allowed(&self, user_id: i64) -> Result<bool, StorageError> {
        let users = self.load().await?;
        Ok(users.contains_key(&user_id.to_string()))
    }

    /// Enroll a user. Returns `false` (no-op) when already enrolled.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted list cannot be read or written.
    pub async fn add_user(
        &self,
        user_id: i64,
        username: &str,
        name: &str,
    ) -> Result<bool, StorageError> {
        let mut users = self.load().await?;
        let key = user_id.to_string();
        if users.contains_key(&key) {
            return Ok(false);
        }
        users.insert(key, AllowListEntry::now(username, name));
        self.save(&users).await?;
        info!("Enrolled user {user_id}");
        Ok(true)
    }

    /// Remove a user. Admins are protected; absent users are reported.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted list cannot be read or written.
    pub async fn remove_user(&self, user_id: i64) -> Result<RemoveOutcome, StorageError> {
        if self.is_admin(user_id) {
            return Ok(RemoveOutcome::Protected);
        }
        let mut users = self.load().await?;
        if users.remove(&user_id.to_string()).is_none() {
            return Ok(RemoveOutcome::NotFound);
        }
        self.save(&users).await?;
        info!("Removed user {user_id}");
        Ok(RemoveOutcome::Removed)
    }

    /// Full user map for admin listings.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted list cannot be read.
    pub async fn list_users(&self) -> Result<UserMap, StorageError> {
        self.load().await
    }

    /// Load the user map, bootstrapping it with the configured admins when
    /// no document exists yet.
    async fn load(&self) -> Result<UserMap, StorageError> {
        if let Some(users) = self.storage.load_json::<UserMap>(USERS_KEY).await? {
            return Ok(users);
        }

        let mut users = UserMap::new();
        for admin_id in &self.admin_ids {
            users.insert(admin_id.to_string(), AllowListEntry::now("", "Admin"));
        }
        self.save(&users).await?;
        info!("Created allow-list with {} admin(s)", users.len());
        Ok(users)
    }

    async fn save(&self, users: &UserMap) -> Result<(), StorageError> {
        self.storage.save_json(USERS_KEY, users).await
    }
}
