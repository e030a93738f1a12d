//! Identity-state events and the role snapshot derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::profile::UserProfile;
use super::role::Role;

/// What happened to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    /// The stored profile changed (role update); observers refetch.
    ProfileChanged,
}

/// Identity-state transition. `seq` is strictly increasing per process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthEvent {
    pub seq: u64,
    pub uid: String,
    pub kind: AuthEventKind,
    /// Session that caused the event. `None` applies to every session of `uid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub at: DateTime<Utc>,
}

/// Immutable view of "current user + profile", replaced wholesale per event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleSnapshot {
    /// Sequence number of the event this snapshot answers
    pub seq: u64,
    /// Signed-in uid, `None` when signed out
    pub uid: Option<String>,
    pub profile: Option<UserProfile>,
    /// A profile fetch for `uid` is in flight
    pub loading: bool,
    /// The last profile fetch failed
    pub error: Option<String>,
}

impl RoleSnapshot {
    pub fn signed_out(seq: u64) -> Self {
        Self {
            seq,
            ..Default::default()
        }
    }

    pub fn loading(seq: u64, uid: &str) -> Self {
        Self {
            seq,
            uid: Some(uid.to_string()),
            loading: true,
            ..Default::default()
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn is_signed_in(&self) -> bool {
        self.uid.is_some()
    }
}
