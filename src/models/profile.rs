//! User profile documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::Identity;
use super::role::Role;

/// Profile stored in the profile store, one per uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Name to greet the user by: display name, then phone, then email.
    pub fn display_label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.phone_number.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("user")
    }
}

/// Profile fields supplied at creation. Timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
}

impl NewProfile {
    pub fn from_identity(identity: &Identity, role: Role) -> Self {
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            photo_url: identity.photo_url.clone(),
            phone_number: identity.phone_number.clone(),
            role,
        }
    }

    /// Materialize with store-assigned timestamps.
    pub fn into_profile(self, now: DateTime<Utc>) -> UserProfile {
        UserProfile {
            uid: self.uid,
            email: self.email,
            display_name: self.display_name,
            photo_url: self.photo_url,
            phone_number: self.phone_number,
            role: self.role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Response for `GET /auth/me`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: Option<UserProfile>,
    pub role: Option<Role>,
    pub display_label: Option<String>,
    /// Role-conditional banner, e.g. "Admin Panel Access"
    pub access: Option<String>,
}

impl MeResponse {
    pub fn signed_out() -> Self {
        Self {
            user: None,
            role: None,
            display_label: None,
            access: None,
        }
    }
}

impl From<UserProfile> for MeResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            role: Some(profile.role),
            display_label: Some(profile.display_label().to_string()),
            access: profile.role.access_label().map(str::to_string),
            user: Some(profile),
        }
    }
}

/// Request body for the privileged role update.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Query for listing profiles.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListProfilesQuery {
    pub limit: Option<u64>,
}

/// Response for listing profiles.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListProfilesResponse {
    pub profiles: Vec<UserProfile>,
}
