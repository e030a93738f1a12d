//! Session cookie handling: `/auth/me`, logout and the WebSocket gate.

use actix_web::test;
use rolegate_lib::auth::{SESSION_COOKIE, verify_session_token};
use rolegate_lib::models::AuthEventKind;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_me_without_session_is_signed_out() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;

    let me = get_me(&app, None).await;
    assert!(me["user"].is_null());
    assert!(me["role"].is_null());
    assert!(me["access"].is_null());
}

#[actix_rt::test]
async fn test_me_with_garbage_cookie_is_signed_out() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;

    let cookie = actix_web::cookie::Cookie::new(SESSION_COOKIE, "garbage");
    let me = get_me(&app, Some(&cookie)).await;
    assert!(me["user"].is_null());
}

#[actix_rt::test]
async fn test_me_reports_role_and_banner() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;

    let (session, body) = sign_in_with_phone(&app, &unique_phone(), None).await;
    let uid = body["profile"]["uid"].as_str().unwrap().to_string();

    let me = get_me(&app, Some(&session)).await;
    assert_eq!(me["role"], "user");
    assert!(me["access"].is_null());

    let (status, _) = put_role(&app, &uid, "admin", None, Some(TEST_ADMIN_KEY)).await;
    assert_eq!(status, 200);

    // Same cookie, new stored role.
    let me = get_me(&app, Some(&session)).await;
    assert_eq!(me["role"], "admin");
    assert_eq!(me["access"], "Admin Panel Access");
    assert_eq!(me["user"]["uid"], uid.as_str());
}

#[actix_rt::test]
async fn test_logout_clears_cookie_and_emits_event() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let (session, body) = sign_in_with_phone(&app, &unique_phone(), None).await;
    let session_id = verify_session_token(session.value(), &test_config().session.secret)
        .unwrap()
        .sid;
    let mut events = ctx.gateway.subscribe();

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .cookie(session)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let cleared = response_cookie(&resp, SESSION_COOKIE).expect("removal cookie");
    assert_eq!(cleared.value(), "");
    assert_eq!(
        cleared.max_age(),
        Some(actix_web::cookie::time::Duration::ZERO)
    );

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, AuthEventKind::SignedOut);
    assert_eq!(event.uid, body["profile"]["uid"].as_str().unwrap());
    // Only this session ends; the user's other cookies stay signed in.
    assert_eq!(event.session_id.as_deref(), Some(session_id.as_str()));

    // The browser drops the cookie, so the next request is anonymous.
    let me = get_me(&app, None).await;
    assert!(me["user"].is_null());
}

#[actix_rt::test]
async fn test_logout_leaves_other_sessions_signed_in() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let phone = unique_phone();
    let (laptop, _) = sign_in_with_phone(&app, &phone, None).await;
    let (phone_session, _) = sign_in_with_phone(&app, &phone, None).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .cookie(laptop)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let me = get_me(&app, Some(&phone_session)).await;
    assert_eq!(me["role"], "user");
}

#[actix_rt::test]
async fn test_logout_without_session_is_ok() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post().uri("/api/v1/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_rt::test]
async fn test_websocket_requires_session() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get().uri("/api/v1/auth/ws").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}
