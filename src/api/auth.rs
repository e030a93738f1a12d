//! Sign-in routes.
//!
//! Endpoints:
//! 1. GET /auth/google: redirect to Google with a CSRF `state`
//! 2. GET /auth/google/callback: verify state, exchange code, reconcile profile, issue session
//! 3. POST /auth/phone/send: text a code, return a confirmation handle
//! 4. POST /auth/phone/verify: check the code, reconcile profile, issue session
//! 5. POST /auth/logout: clear the session
//! 6. GET /auth/me: current user and role, or `{user: null}`

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use tracing::{info, warn};

use crate::auth::{
    OAUTH_STATE_COOKIE, REQUESTED_ROLE_COOKIE, SESSION_COOKIE, SessionUser, auth_cookie,
    create_session_token, removal_cookie, session_cookie,
};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    CallbackQuery, GoogleSignInQuery, MeResponse, PhoneCodeSentResponse, SendPhoneCodeRequest,
    SignInResponse, UserProfile, VerifyPhoneCodeRequest,
};
use crate::services::{IdentityGateway, ProfileService};

/// Configure sign-in routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(google_login)
        .service(google_callback)
        .service(send_phone_code)
        .service(verify_phone_code)
        .service(logout)
        .service(get_current_user);
}

/// Redirect to the Google consent screen.
///
/// GET /api/v1/auth/google?role=moderator
#[utoipa::path(
    get,
    path = "/api/v1/auth/google",
    tag = "Auth",
    params(
        ("role" = Option<String>, Query, description = "Role to assign on first sign-in (user, admin, moderator)")
    ),
    responses(
        (status = 302, description = "Redirect to Google"),
        (status = 400, description = "Google sign-in not configured", body = crate::error::ErrorResponse)
    )
)]
#[get("/auth/google")]
pub async fn google_login(
    query: web::Query<GoogleSignInQuery>,
    config: web::Data<Config>,
    gateway: web::Data<IdentityGateway>,
) -> AppResult<HttpResponse> {
    let start = gateway.begin_google_sign_in()?;
    let secure = config.environment.is_production();

    let role_cookie = match query.role.as_deref() {
        Some(role) if !role.is_empty() => auth_cookie(REQUESTED_ROLE_COOKIE, role.to_string(), secure),
        _ => removal_cookie(REQUESTED_ROLE_COOKIE, secure),
    };

    Ok(HttpResponse::Found()
        .cookie(auth_cookie(OAUTH_STATE_COOKIE, start.state, secure))
        .cookie(role_cookie)
        .append_header(("Location", start.authorize_url))
        .finish())
}

/// Handle the Google OAuth callback.
///
/// GET /api/v1/auth/google/callback?code=...&state=...
#[utoipa::path(
    get,
    path = "/api/v1/auth/google/callback",
    tag = "Auth",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("state" = Option<String>, Query, description = "CSRF state echoed by Google"),
        ("error" = Option<String>, Query, description = "Set when the user declined")
    ),
    responses(
        (status = 302, description = "Signed in, redirect to the post-login page"),
        (status = 401, description = "State mismatch or credential rejected", body = crate::error::ErrorResponse),
        (status = 502, description = "Google unreachable", body = crate::error::ErrorResponse)
    )
)]
#[get("/auth/google/callback")]
pub async fn google_callback(
    req: HttpRequest,
    query: web::Query<CallbackQuery>,
    config: web::Data<Config>,
    gateway: web::Data<IdentityGateway>,
    profiles: web::Data<ProfileService>,
) -> AppResult<HttpResponse> {
    if let Some(ref err) = query.error {
        warn!("Google sign-in declined: {}", err);
        return Err(AppError::Unauthorized(
            "Google sign-in was cancelled".to_string(),
        ));
    }

    // --- CSRF state verification ---
    let expected_state = req
        .cookie(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| {
            warn!("OAuth callback: missing state cookie");
            AppError::Unauthorized("OAuth state verification failed".to_string())
        })?;

    let provided_state = query.state.as_deref().unwrap_or("");
    if provided_state.is_empty() || provided_state != expected_state {
        warn!("OAuth callback: state mismatch");
        return Err(AppError::Unauthorized(
            "OAuth state verification failed".to_string(),
        ));
    }

    let identity = gateway
        .complete_google_sign_in(query.code.as_deref().unwrap_or(""))
        .await?;

    let requested_role = req
        .cookie(REQUESTED_ROLE_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    let profile = profiles
        .ensure_profile(&identity, requested_role.as_deref())
        .await?;

    let secure = config.environment.is_production();
    let mut response = issue_session(&profile, &config, &gateway)?;

    Ok(response
        .cookie(removal_cookie(OAUTH_STATE_COOKIE, secure))
        .cookie(removal_cookie(REQUESTED_ROLE_COOKIE, secure))
        .append_header(("Location", config.session.post_login_redirect.clone()))
        .finish())
}

/// Text a verification code to a phone number.
///
/// POST /api/v1/auth/phone/send
#[utoipa::path(
    post,
    path = "/api/v1/auth/phone/send",
    tag = "Auth",
    request_body = SendPhoneCodeRequest,
    responses(
        (status = 200, description = "Code sent", body = PhoneCodeSentResponse),
        (status = 400, description = "Malformed phone number", body = crate::error::ErrorResponse),
        (status = 502, description = "SMS provider unreachable", body = crate::error::ErrorResponse)
    )
)]
#[post("/auth/phone/send")]
pub async fn send_phone_code(
    body: web::Json<SendPhoneCodeRequest>,
    gateway: web::Data<IdentityGateway>,
) -> AppResult<HttpResponse> {
    let confirmation = gateway.send_phone_code(&body.phone_number).await?;

    Ok(HttpResponse::Ok().json(PhoneCodeSentResponse {
        confirmation: confirmation.handle,
        expires_at: confirmation.expires_at,
    }))
}

/// Confirm a verification code and sign in.
///
/// POST /api/v1/auth/phone/verify
#[utoipa::path(
    post,
    path = "/api/v1/auth/phone/verify",
    tag = "Auth",
    request_body = VerifyPhoneCodeRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 400, description = "Malformed code", body = crate::error::ErrorResponse),
        (status = 401, description = "Wrong code or expired handle", body = crate::error::ErrorResponse)
    )
)]
#[post("/auth/phone/verify")]
pub async fn verify_phone_code(
    body: web::Json<VerifyPhoneCodeRequest>,
    config: web::Data<Config>,
    gateway: web::Data<IdentityGateway>,
    profiles: web::Data<ProfileService>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let identity = gateway
        .confirm_phone_code(&body.confirmation, &body.code)
        .await?;

    let profile = profiles
        .ensure_profile(&identity, body.role.as_deref())
        .await?;

    let mut response = issue_session(&profile, &config, &gateway)?;
    response.status(actix_web::http::StatusCode::OK);
    Ok(response.json(SignInResponse { profile }))
}

/// Sign out: clear the session cookie and notify observers.
///
/// POST /api/v1/auth/logout
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Signed out")
    )
)]
#[post("/auth/logout")]
pub async fn logout(
    session: Option<SessionUser>,
    config: web::Data<Config>,
    gateway: web::Data<IdentityGateway>,
) -> HttpResponse {
    if let Some(user) = session {
        gateway.sign_out(&user.uid, &user.session_id);
        info!(uid = %user.uid, "Signed out");
    }

    HttpResponse::Ok()
        .cookie(removal_cookie(
            SESSION_COOKIE,
            config.environment.is_production(),
        ))
        .json(serde_json::json!({ "message": "Signed out" }))
}

/// Current user, role and display label.
///
/// GET /api/v1/auth/me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user, or `user: null` when signed out", body = MeResponse)
    )
)]
#[get("/auth/me")]
pub async fn get_current_user(
    session: Option<SessionUser>,
    profiles: web::Data<ProfileService>,
) -> AppResult<HttpResponse> {
    let Some(user) = session else {
        return Ok(HttpResponse::Ok().json(MeResponse::signed_out()));
    };

    let response = match profiles.get_profile(&user.uid).await? {
        Some(profile) => MeResponse::from(profile),
        None => MeResponse::signed_out(),
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Session cookie plus the `SignedIn` event, as a 302 builder.
fn issue_session(
    profile: &UserProfile,
    config: &Config,
    gateway: &IdentityGateway,
) -> AppResult<actix_web::HttpResponseBuilder> {
    let token = create_session_token(&profile.uid, profile.role, &config.session)?;
    gateway.signed_in(&profile.uid);
    info!(uid = %profile.uid, role = %profile.role, "Signed in");

    let mut response = HttpResponse::Found();
    response.cookie(session_cookie(
        token,
        &config.session,
        config.environment.is_production(),
    ));
    Ok(response)
}
