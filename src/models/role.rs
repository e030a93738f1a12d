//! User roles.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role stored on a profile. Closed set; anything else becomes `User`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Moderator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::Moderator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Moderator => "moderator",
        }
    }

    /// Exact match on the stored spelling; case and whitespace variants are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "moderator" => Some(Self::Moderator),
            _ => None,
        }
    }

    /// Parse a requested role, falling back to `User` for anything outside the set.
    pub fn coerce(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!(requested = %s, "Invalid role requested, defaulting to 'user'");
            Self::User
        })
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Admins and moderators may browse other users' profiles.
    pub fn can_view_profiles(&self) -> bool {
        matches!(self, Self::Admin | Self::Moderator)
    }

    /// Banner shown by role-conditional UI, if any.
    pub fn access_label(&self) -> Option<&'static str> {
        match self {
            Self::Admin => Some("Admin Panel Access"),
            Self::Moderator => Some("Moderator Access"),
            Self::User => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
