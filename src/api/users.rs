//! Profile administration routes.
//!
//! Callers authenticate with a session cookie or the bootstrap `X-Admin-Key`.
//! Session callers are authorized by the role currently stored on their
//! profile, not by the role recorded in their token.

use actix_web::{HttpResponse, get, put, web};
use tracing::{info, warn};

use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::models::{ListProfilesQuery, ListProfilesResponse, Role, UpdateRoleRequest, UserProfile};
use crate::services::ProfileService;

/// Default page size for profile listings.
const DEFAULT_LIST_LIMIT: u64 = 50;

/// Configure profile routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_profiles)
        .service(get_profile)
        .service(update_role);
}

/// Check the caller's stored role against `allowed`.
async fn authorize(
    caller: &Caller,
    profiles: &ProfileService,
    allowed: fn(&Role) -> bool,
) -> AppResult<()> {
    let user = match caller {
        Caller::Bootstrap => return Ok(()),
        Caller::Session(user) => user,
    };

    let role = profiles
        .get_profile(&user.uid)
        .await?
        .map(|p| p.role)
        .ok_or_else(|| AppError::Forbidden("No profile for this session".to_string()))?;

    if allowed(&role) {
        Ok(())
    } else {
        warn!(uid = %user.uid, %role, "Insufficient role");
        Err(AppError::Forbidden(format!(
            "Role '{}' may not perform this action",
            role
        )))
    }
}

/// List profiles, newest first.
///
/// GET /api/v1/users?limit=50
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    params(
        ("limit" = Option<u64>, Query, description = "Maximum number of profiles (default 50, max 500)")
    ),
    responses(
        (status = 200, description = "Profiles", body = ListProfilesResponse),
        (status = 401, description = "Not signed in", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin or moderator role required", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[get("/users")]
pub async fn list_profiles(
    caller: Caller,
    query: web::Query<ListProfilesQuery>,
    profiles: web::Data<ProfileService>,
) -> AppResult<HttpResponse> {
    authorize(&caller, &profiles, Role::can_view_profiles).await?;

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let profiles = profiles.list_profiles(limit).await?;
    Ok(HttpResponse::Ok().json(ListProfilesResponse { profiles }))
}

/// Get one profile. Users may always read their own.
///
/// GET /api/v1/users/{uid}
#[utoipa::path(
    get,
    path = "/api/v1/users/{uid}",
    tag = "Users",
    params(
        ("uid" = String, Path, description = "Profile uid")
    ),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 403, description = "Admin or moderator role required", body = crate::error::ErrorResponse),
        (status = 404, description = "No such profile", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[get("/users/{uid}")]
pub async fn get_profile(
    caller: Caller,
    path: web::Path<String>,
    profiles: web::Data<ProfileService>,
) -> AppResult<HttpResponse> {
    let uid = path.into_inner();
    let own = matches!(&caller, Caller::Session(user) if user.uid == uid);
    if !own {
        authorize(&caller, &profiles, Role::can_view_profiles).await?;
    }

    let profile = profiles
        .get_profile(&uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {}", uid)))?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Change a user's role.
///
/// PUT /api/v1/users/{uid}/role
#[utoipa::path(
    put,
    path = "/api/v1/users/{uid}/role",
    tag = "Users",
    params(
        ("uid" = String, Path, description = "Profile uid")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Unknown role", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse),
        (status = 404, description = "No such profile", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[put("/users/{uid}/role")]
pub async fn update_role(
    caller: Caller,
    path: web::Path<String>,
    body: web::Json<UpdateRoleRequest>,
    profiles: web::Data<ProfileService>,
) -> AppResult<HttpResponse> {
    authorize(&caller, &profiles, Role::is_admin).await?;

    let uid = path.into_inner();
    let profile = profiles.update_role(&uid, &body.role).await?;

    let by = match &caller {
        Caller::Bootstrap => "admin-key",
        Caller::Session(user) => user.uid.as_str(),
    };
    info!(uid = %uid, role = %profile.role, by = %by, "Role changed");

    Ok(HttpResponse::Ok().json(profile))
}
