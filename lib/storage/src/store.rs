//! Profile store
//!
//! The façade and the aggregator read users through [`ProfileStore`], so a
//! database-backed store can replace the in-memory one without touching the
//! scoring path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use matchmate_core::{Profile, Result, UserId, UserRecord};
use matchmate_schema::FieldRegistry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::persistence::{read_json, write_json};

/// Read access to users and their profiles
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserRecord>>;

    async fn find_profile_by_user_id(&self, id: &UserId) -> Result<Option<Profile>> {
        Ok(self.find_user(id).await?.and_then(|user| user.profile))
    }

    /// Candidate users with a usable profile, except `exclude`
    async fn list_candidate_profiles(&self, exclude: &UserId) -> Result<Vec<UserRecord>>;

    /// Users with the given ids, in request order. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<UserRecord>>;
}

/// On-disk form of an [`InMemoryProfileStore`]
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub users: Vec<UserRecord>,
    pub timestamp: DateTime<Utc>,
}

/// Profile store backed by an ordered map
pub struct InMemoryProfileStore {
    users: RwLock<BTreeMap<UserId, UserRecord>>,
    registry: FieldRegistry,
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::with_registry(FieldRegistry::default())
    }

    /// Store that checks inserted profiles against `registry`
    pub fn with_registry(registry: FieldRegistry) -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            registry,
        }
    }

    pub fn from_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let store = Self::new();
        for user in users {
            store.insert(user);
        }
        store
    }

    /// Insert or replace a user, returning the previous record.
    ///
    /// Values outside the registry vocabulary are kept but logged; they
    /// encode to zero slots.
    pub fn insert(&self, user: UserRecord) -> Option<UserRecord> {
        if let Some(profile) = &user.profile {
            for violation in self.registry.check_profile(profile) {
                warn!(
                    user_id = %user.id,
                    field = %violation.field,
                    value = %violation.value,
                    "profile value not in field vocabulary"
                );
            }
        }
        self.users.write().insert(user.id.clone(), user)
    }

    /// Ids of candidates with a usable profile
    pub fn usable_user_ids(&self) -> Vec<UserId> {
        self.users
            .read()
            .values()
            .filter(|u| u.is_candidate() && u.usable_profile().is_some())
            .map(|u| u.id.clone())
            .collect()
    }

    pub fn remove(&self, id: &UserId) -> Option<UserRecord> {
        self.users.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Insert the users of a snapshot file, returning how many were read.
    /// A missing file reads as empty.
    pub fn load_snapshot(&self, path: &Path) -> Result<usize> {
        let Some(snapshot) = read_json::<StoreSnapshot>(path)? else {
            return Ok(0);
        };
        let count = snapshot.users.len();
        for user in snapshot.users {
            self.insert(user);
        }
        info!(path = %path.display(), users = count, "profile snapshot loaded");
        Ok(count)
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = StoreSnapshot {
            users: self.users.read().values().cloned().collect(),
            timestamp: Utc::now(),
        };
        write_json(path, &snapshot)?;
        info!(path = %path.display(), users = snapshot.users.len(), "profile snapshot saved");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn list_candidate_profiles(&self, exclude: &UserId) -> Result<Vec<UserRecord>> {
        Ok(self
            .users
            .read()
            .values()
            .filter(|u| &u.id != exclude && u.is_candidate() && u.usable_profile().is_some())
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<UserRecord>> {
        let users = self.users.read();
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}
