//! Sign-in request/response bodies and token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::profile::UserProfile;

/// Query for `GET /auth/google`.
#[derive(Debug, Deserialize)]
pub struct GoogleSignInQuery {
    /// Role to assign if this is the first sign-in
    pub role: Option<String>,
}

/// Query for the Google OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Request to start phone verification.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendPhoneCodeRequest {
    /// E.164 number including country code, e.g. `+15551234567`
    pub phone_number: String,
}

/// Returned after the SMS code is sent.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PhoneCodeSentResponse {
    /// Opaque handle to present with the code
    pub confirmation: String,
    pub expires_at: DateTime<Utc>,
}

/// Request to confirm an SMS code.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyPhoneCodeRequest {
    pub confirmation: String,
    pub code: String,
    /// Role to assign if this is the first sign-in
    #[serde(default)]
    pub role: Option<String>,
}

/// Returned after a successful sign-in.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignInResponse {
    pub profile: UserProfile,
}

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    /// Role at sign-in time. Privileged checks re-read the store.
    pub role: String,
    /// Identifies this sign-in; sign-out events carry it.
    #[serde(default)]
    pub sid: String,
}

/// Claims inside a phone confirmation handle.
#[derive(Debug, Serialize, Deserialize)]
pub struct PhoneConfirmationClaims {
    /// E.164 phone number the code was sent to
    pub sub: String,
    /// Provider verification id
    pub sid: String,
    pub iss: String,
    pub purpose: String,
    pub exp: usize,
    pub iat: usize,
}
