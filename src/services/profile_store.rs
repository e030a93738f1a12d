//! Profile store seam.
//!
//! The profile store is a remote document collection keyed by uid. The
//! service talks to it only through [`ProfileStore`]; `db::PgProfileStore`
//! is the PostgreSQL backend and [`MemoryProfileStore`] keeps documents in
//! process (development and tests).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::models::{NewProfile, Role, UserProfile};

/// Upper bound for list queries.
pub const MAX_LIST_LIMIT: u64 = 500;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile for `uid`, `None` if absent.
    async fn get(&self, uid: &str) -> AppResult<Option<UserProfile>>;

    /// Create a profile. Fails with `Conflict` if one already exists for the uid.
    /// Both timestamps are assigned by the store.
    async fn create(&self, profile: NewProfile) -> AppResult<()>;

    /// Set `role` and refresh `updated_at`; every other field is left as is.
    async fn update_role(&self, uid: &str, role: Role) -> AppResult<UserProfile>;

    /// Newest profiles first.
    async fn list(&self, limit: u64) -> AppResult<Vec<UserProfile>>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> AppResult<()>;
}

/// In-process profile store.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, uid: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(uid).cloned())
    }

    async fn create(&self, profile: NewProfile) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.uid) {
            return Err(AppError::Conflict(format!(
                "Profile {} already exists",
                profile.uid
            )));
        }
        profiles.insert(profile.uid.clone(), profile.into_profile(Utc::now()));
        Ok(())
    }

    async fn update_role(&self, uid: &str, role: Role) -> AppResult<UserProfile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", uid)))?;
        profile.role = role;
        profile.updated_at = Utc::now().max(profile.updated_at);
        Ok(profile.clone())
    }

    async fn list(&self, limit: u64) -> AppResult<Vec<UserProfile>> {
        let mut profiles: Vec<UserProfile> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.uid.cmp(&b.uid)));
        profiles.truncate(limit.min(MAX_LIST_LIMIT) as usize);
        Ok(profiles)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
