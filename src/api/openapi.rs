//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::auth::SESSION_COOKIE;
use crate::config::ADMIN_KEY_HEADER;
use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rolegate Server",
        version = "0.1.0",
        description = "Google and phone sign-in with per-user roles (user, admin, moderator)"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Auth endpoints
        api::auth::google_login,
        api::auth::google_callback,
        api::auth::send_phone_code,
        api::auth::verify_phone_code,
        api::auth::logout,
        api::auth::get_current_user,
        // Profile endpoints
        api::users::list_profiles,
        api::users::get_profile,
        api::users::update_role,
    ),
    components(
        schemas(
            error::ErrorResponse,
            api::health::HealthResponse,
            api::health::ReadyResponse,
            models::Role,
            models::UserProfile,
            models::MeResponse,
            models::SendPhoneCodeRequest,
            models::PhoneCodeSentResponse,
            models::VerifyPhoneCodeRequest,
            models::SignInResponse,
            models::UpdateRoleRequest,
            models::ListProfilesResponse,
            models::RoleSnapshot,
            models::AuthEvent,
            models::AuthEventKind,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Google and phone sign-in, session"),
        (name = "Users", description = "Profile lookup and role administration")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add admin key and session cookie security schemes.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_KEY_HEADER))),
            );
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
        }
    }
}
