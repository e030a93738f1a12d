//! Actix-web extractors for session and admin-key authentication.
//!
//! Header secrets are wrapped in `SecretString` as soon as they are read and
//! are never logged.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use secrecy::{ExposeSecret, SecretString};
use std::future::{Ready, ready};

use super::{AdminKey, SESSION_COOKIE, verify_session_token};
use crate::config::{ADMIN_KEY_HEADER, Config};
use crate::error::ErrorResponse;

/// Extract a secret header value, wrapping it in SecretString.
/// Returns None if the header is missing or invalid UTF-8.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| SecretString::from(s.to_string()))
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl AuthError {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
        })
    }
}

/// Signed-in user from the session cookie.
///
/// The role in the token is informational; privileged checks re-read the
/// profile. Use `Option<SessionUser>` where signed-out callers are allowed.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub uid: String,
    /// Id of this sign-in, distinct per session cookie
    pub session_id: String,
}

impl SessionUser {
    fn from_cookie(req: &HttpRequest) -> Result<Self, AuthError> {
        let config = req
            .app_data::<web::Data<Config>>()
            .ok_or_else(|| AuthError::new("Internal configuration error"))?;

        let cookie = req
            .cookie(SESSION_COOKIE)
            .ok_or_else(|| AuthError::new("Not signed in"))?;

        let claims = verify_session_token(cookie.value(), &config.session.secret).map_err(|e| {
            tracing::debug!("{}", e);
            AuthError::new("Session expired, please sign in again")
        })?;

        Ok(Self {
            uid: claims.sub,
            session_id: claims.sid,
        })
    }
}

impl FromRequest for SessionUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_cookie(req))
    }
}

/// Caller of a privileged endpoint.
#[derive(Debug, Clone)]
pub enum Caller {
    /// Presented the bootstrap `X-Admin-Key`.
    Bootstrap,
    /// Signed-in user; the handler decides whether their role suffices.
    Session(SessionUser),
}

impl FromRequest for Caller {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if let Some(provided) = extract_secret_header(req, ADMIN_KEY_HEADER) {
            let accepted = req
                .app_data::<web::Data<AdminKey>>()
                .is_some_and(|key| key.verify(provided.expose_secret()));
            if accepted {
                return ready(Ok(Caller::Bootstrap));
            }
            tracing::warn!(path = %req.path(), "Rejected admin key");
            return ready(Err(AuthError::new("Invalid admin key")));
        }

        ready(SessionUser::from_cookie(req).map(Caller::Session))
    }
}
