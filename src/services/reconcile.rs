//! Profile reconciliation and the privileged role path.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{AuthEventKind, Identity, NewProfile, Role, UserProfile};
use crate::services::auth_events::AuthEventBroadcaster;
use crate::services::profile_store::ProfileStore;

/// Return the stored profile for `identity`, creating it on first sign-in.
///
/// `requested_role` only matters on creation. Values outside the role set
/// become `user`; an existing profile is returned unchanged whatever is
/// requested. A create that loses a race against a concurrent sign-in
/// returns the winner's profile.
pub async fn ensure_profile(
    store: &dyn ProfileStore,
    identity: &Identity,
    requested_role: Option<&str>,
) -> AppResult<UserProfile> {
    if let Some(existing) = store.get(&identity.uid).await? {
        return Ok(existing);
    }

    let role = requested_role.map(Role::coerce).unwrap_or_default();
    let profile = NewProfile::from_identity(identity, role);

    match store.create(profile).await {
        Ok(()) => info!(uid = %identity.uid, %role, "Profile created"),
        Err(AppError::Conflict(_)) => {
            warn!(uid = %identity.uid, "Profile created concurrently, using stored profile")
        }
        Err(e) => return Err(e),
    }

    store.get(&identity.uid).await?.ok_or_else(|| {
        AppError::NotFound(format!("Profile {} (after write)", identity.uid))
    })
}

/// Profile operations shared by the HTTP handlers and the CLI.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    events: AuthEventBroadcaster,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>, events: AuthEventBroadcaster) -> Self {
        Self { store, events }
    }

    pub async fn ensure_profile(
        &self,
        identity: &Identity,
        requested_role: Option<&str>,
    ) -> AppResult<UserProfile> {
        ensure_profile(self.store.as_ref(), identity, requested_role).await
    }

    pub async fn get_profile(&self, uid: &str) -> AppResult<Option<UserProfile>> {
        self.store.get(uid).await
    }

    /// Privileged mutation: set the role of an existing profile.
    ///
    /// Unlike creation, an unknown role is an error here.
    pub async fn update_role(&self, uid: &str, role: &str) -> AppResult<UserProfile> {
        let role = Role::parse(role).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Role must be one of: {}",
                Role::ALL.map(|r| r.as_str()).join(", ")
            ))
        })?;

        let profile = self.store.update_role(uid, role).await?;
        info!(uid = %uid, %role, "Role updated");
        self.events.publish(uid, AuthEventKind::ProfileChanged);
        Ok(profile)
    }

    pub async fn list_profiles(&self, limit: u64) -> AppResult<Vec<UserProfile>> {
        self.store.list(limit).await
    }

    pub fn store(&self) -> Arc<dyn ProfileStore> {
        self.store.clone()
    }
}
