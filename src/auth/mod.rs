//! Session cookies, session tokens and the bootstrap admin key.

mod extractor;

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::config::SessionSettings;
use crate::error::{AppError, AppResult};
use crate::models::{Role, SessionClaims};
use crate::services::identity::TOKEN_ISSUER;

pub use extractor::{AuthError, Caller, SessionUser};

/// Session token cookie name (HS256 JWT).
pub const SESSION_COOKIE: &str = "rolegate_session";
/// OAuth CSRF state cookie, checked on the Google callback.
pub const OAUTH_STATE_COOKIE: &str = "rolegate_oauth_state";
/// Role requested when Google sign-in started, applied if the profile is new.
pub const REQUESTED_ROLE_COOKIE: &str = "rolegate_requested_role";

/// Wrapper type for the bootstrap admin key.
///
/// `Debug` prints `[REDACTED]`; the value is only reachable through
/// `expose_secret()` inside [`AdminKey::verify`].
#[derive(Clone)]
pub struct AdminKey(Option<SecretString>);

impl AdminKey {
    pub fn new(key: Option<SecretString>) -> Self {
        Self(key)
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    /// Constant-time comparison with the configured key. Always false when unset.
    pub fn verify(&self, provided: &str) -> bool {
        match &self.0 {
            Some(secret) => secret
                .expose_secret()
                .as_bytes()
                .ct_eq(provided.as_bytes())
                .into(),
            None => false,
        }
    }
}

impl std::fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "AdminKey([REDACTED])"),
            None => write!(f, "AdminKey(None)"),
        }
    }
}

/// Mint a session token for `uid`.
pub fn create_session_token(uid: &str, role: Role, session: &SessionSettings) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::seconds(session.ttl_secs as i64);

    let claims = SessionClaims {
        sub: uid.to_string(),
        iss: TOKEN_ISSUER.to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
        role: role.as_str().to_string(),
        sid: hex::encode(rand::random::<[u8; 16]>()),
    };

    let key = EncodingKey::from_secret(session.secret.expose_secret().as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::InvalidInput(format!("Failed to create session token: {}", e)))
}

/// Verify a session token and return its claims.
pub fn verify_session_token(token: &str, secret: &SecretString) -> Result<SessionClaims, String> {
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.validate_aud = false;

    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid session token: {}", e))
}

/// HttpOnly, SameSite=Lax cookie scoped to the whole site.
pub fn auth_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie
}

/// Session cookie that expires with the token.
pub fn session_cookie(token: String, session: &SessionSettings, secure: bool) -> Cookie<'static> {
    let mut cookie = auth_cookie(SESSION_COOKIE, token, secure);
    cookie.set_max_age(CookieDuration::seconds(session.ttl_secs as i64));
    cookie
}

/// Cookie that tells the browser to drop `name`.
pub fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = auth_cookie(name, String::new(), secure);
    cookie.make_removal();
    cookie
}
