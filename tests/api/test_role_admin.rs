//! Role administration and role-gated profile access.

use actix_web::test;
use rolegate_lib::models::{AuthEventKind, Role};
use serde_json::Value;

use super::test_helpers::*;

async fn list_users<S>(app: &S, session: &actix_web::cookie::Cookie<'static>) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get()
        .uri("/api/v1/users?limit=10")
        .cookie(session.clone())
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    (status, test::read_body_json(resp).await)
}

#[actix_rt::test]
async fn test_user_session_cannot_change_roles() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let target = ctx.seed_profile("g-200", Role::User).await;

    let (session, _) = sign_in_with_phone(&app, &unique_phone(), Some("user")).await;
    let (status, body) = put_role(&app, &target, "admin", Some(&session), None).await;

    assert_eq!(status, 403);
    assert_eq!(body["error"], "FORBIDDEN");
    let stored = ctx.profiles.get_profile(&target).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::User);
}

#[actix_rt::test]
async fn test_moderator_session_cannot_change_roles() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let target = ctx.seed_profile("g-201", Role::User).await;

    let (session, _) = sign_in_with_phone(&app, &unique_phone(), Some("moderator")).await;
    let (status, _) = put_role(&app, &target, "moderator", Some(&session), None).await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
async fn test_admin_key_changes_only_role() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let target = ctx.seed_profile("g-202", Role::User).await;
    let before = ctx.profiles.get_profile(&target).await.unwrap().unwrap();
    let mut events = ctx.gateway.subscribe();

    let (status, body) = put_role(&app, &target, "moderator", None, Some(TEST_ADMIN_KEY)).await;

    assert_eq!(status, 200);
    assert_eq!(body["role"], "moderator");

    let after = ctx.profiles.get_profile(&target).await.unwrap().unwrap();
    assert_eq!(after.role, Role::Moderator);
    assert_eq!(after.email, before.email);
    assert_eq!(after.display_name, before.display_name);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, AuthEventKind::ProfileChanged);
    assert_eq!(event.uid, target);
}

#[actix_rt::test]
async fn test_wrong_admin_key_is_unauthorized() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let target = ctx.seed_profile("g-203", Role::User).await;

    let (status, _) = put_role(&app, &target, "admin", None, Some("not-the-key")).await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_anonymous_role_change_is_unauthorized() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let target = ctx.seed_profile("g-204", Role::User).await;

    let (status, _) = put_role(&app, &target, "admin", None, None).await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_invalid_role_and_missing_profile() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let target = ctx.seed_profile("g-205", Role::Moderator).await;

    let (status, body) = put_role(&app, &target, "superuser", None, Some(TEST_ADMIN_KEY)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
    let stored = ctx.profiles.get_profile(&target).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Moderator);

    let (status, body) = put_role(&app, "google:nobody", "admin", None, Some(TEST_ADMIN_KEY)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[actix_rt::test]
async fn test_promoted_session_gains_admin_rights() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let target = ctx.seed_profile("g-206", Role::User).await;

    let (session, body) = sign_in_with_phone(&app, &unique_phone(), None).await;
    let uid = body["profile"]["uid"].as_str().unwrap().to_string();

    let (status, _) = put_role(&app, &target, "admin", Some(&session), None).await;
    assert_eq!(status, 403);

    let (status, _) = put_role(&app, &uid, "admin", None, Some(TEST_ADMIN_KEY)).await;
    assert_eq!(status, 200);

    let (status, body) = put_role(&app, &target, "moderator", Some(&session), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["role"], "moderator");
}

#[actix_rt::test]
async fn test_demoted_session_loses_admin_rights() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let target = ctx.seed_profile("g-207", Role::User).await;

    let (session, body) = sign_in_with_phone(&app, &unique_phone(), Some("admin")).await;
    let uid = body["profile"]["uid"].as_str().unwrap().to_string();

    let (status, _) = put_role(&app, &uid, "user", None, Some(TEST_ADMIN_KEY)).await;
    assert_eq!(status, 200);

    // The token still says admin; the store decides.
    let (status, _) = put_role(&app, &target, "admin", Some(&session), None).await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
async fn test_moderator_can_list_and_user_cannot() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    ctx.seed_profile("g-208", Role::User).await;

    let (moderator, _) = sign_in_with_phone(&app, &unique_phone(), Some("moderator")).await;
    let (status, body) = list_users(&app, &moderator).await;
    assert_eq!(status, 200);
    assert_eq!(body["profiles"].as_array().map(Vec::len), Some(2));

    let (user, _) = sign_in_with_phone(&app, &unique_phone(), Some("user")).await;
    let (status, _) = list_users(&app, &user).await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
async fn test_user_can_read_own_profile_only() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let other = ctx.seed_profile("g-209", Role::User).await;

    let (session, body) = sign_in_with_phone(&app, &unique_phone(), None).await;
    let uid = body["profile"]["uid"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/users/{}", uid))
        .cookie(session.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let profile: Value = test::read_body_json(resp).await;
    assert_eq!(profile["uid"], uid.as_str());

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/users/{}", other))
        .cookie(session)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}
