//! Authenticated identities returned by the identity provider adapters.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Which provider authenticated the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProviderKind {
    Google,
    Phone,
}

/// An identity the provider has vouched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    /// Provider-scoped user id, used as the profile key
    pub uid: String,
    pub provider: IdentityProviderKind,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
}

impl Identity {
    /// Identity from Google's OpenID `sub` claim.
    pub fn google(
        sub: &str,
        email: Option<String>,
        display_name: Option<String>,
        photo_url: Option<String>,
    ) -> Self {
        Self {
            uid: format!("google:{}", sub),
            provider: IdentityProviderKind::Google,
            email,
            display_name,
            photo_url,
            phone_number: None,
        }
    }

    /// Identity for a verified E.164 phone number.
    pub fn phone(phone_number: &str) -> Self {
        Self {
            uid: phone_uid(phone_number),
            provider: IdentityProviderKind::Phone,
            email: None,
            display_name: None,
            photo_url: None,
            phone_number: Some(phone_number.to_string()),
        }
    }
}

/// Stable uid for a phone number. The number itself stays out of the key.
pub fn phone_uid(phone_number: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(phone_number.as_bytes());
    format!("phone:{}", hex::encode(hasher.finalize()))
}
