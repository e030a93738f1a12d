//! Google OAuth redirect and callback.

use actix_web::test;
use rolegate_lib::auth::{OAUTH_STATE_COOKIE, REQUESTED_ROLE_COOKIE, SESSION_COOKIE};
use rolegate_lib::models::AuthEventKind;

use super::fake_providers::google_code;
use super::test_helpers::*;

/// Start sign-in and return the state and requested-role cookies.
async fn start_sign_in<S>(
    app: &S,
    role: Option<&str>,
) -> (
    actix_web::cookie::Cookie<'static>,
    actix_web::cookie::Cookie<'static>,
)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let uri = match role {
        Some(role) => format!("/api/v1/auth/google?role={}", role),
        None => "/api/v1/auth/google".to_string(),
    };
    let resp = test::call_service(app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), 302);

    let location = resp
        .headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .expect("redirect location")
        .to_string();
    let state = response_cookie(&resp, OAUTH_STATE_COOKIE).expect("state cookie");
    let role_cookie = response_cookie(&resp, REQUESTED_ROLE_COOKIE).expect("role cookie");

    assert!(location.ends_with(&format!("state={}", state.value())));
    assert_eq!(state.http_only(), Some(true));
    (state, role_cookie)
}

#[actix_rt::test]
async fn test_google_sign_in_creates_profile_with_requested_role() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let mut events = ctx.gateway.subscribe();

    let (state, role_cookie) = start_sign_in(&app, Some("moderator")).await;
    assert_eq!(role_cookie.value(), "moderator");

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/auth/google/callback?code={}&state={}",
            google_code("g-100"),
            state.value()
        ))
        .cookie(state.clone())
        .cookie(role_cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
    assert_eq!(
        resp.headers().get("Location").and_then(|v| v.to_str().ok()),
        Some(POST_LOGIN_REDIRECT)
    );
    let session = response_cookie(&resp, SESSION_COOKIE).expect("session cookie");
    let cleared_state = response_cookie(&resp, OAUTH_STATE_COOKIE).expect("state removal");
    assert_eq!(cleared_state.value(), "");

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, AuthEventKind::SignedIn);
    assert_eq!(event.uid, "google:g-100");

    let me = get_me(&app, Some(&session)).await;
    assert_eq!(me["role"], "moderator");
    assert_eq!(me["user"]["email"], "g-100@example.com");
    assert_eq!(me["display_label"], "User g-100");
    assert_eq!(me["access"], "Moderator Access");
}

#[actix_rt::test]
async fn test_google_sign_in_defaults_to_user_role() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;

    let (state, _) = start_sign_in(&app, None).await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/auth/google/callback?code={}&state={}",
            google_code("g-101"),
            state.value()
        ))
        .cookie(state.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);

    let profile = ctx.profiles.get_profile("google:g-101").await.unwrap().unwrap();
    assert_eq!(profile.role.as_str(), "user");
}

#[actix_rt::test]
async fn test_callback_rejects_state_mismatch() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;

    let (state, _) = start_sign_in(&app, Some("admin")).await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/auth/google/callback?code={}&state=forged",
            google_code("g-102")
        ))
        .cookie(state)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    assert!(ctx.profiles.get_profile("google:g-102").await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_callback_rejects_missing_state_cookie() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/auth/google/callback?code={}&state=abc",
            google_code("g-103")
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_rt::test]
async fn test_callback_rejects_bad_code_and_declined_consent() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;
    let (state, _) = start_sign_in(&app, None).await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/auth/google/callback?code=bogus&state={}",
            state.value()
        ))
        .cookie(state.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/google/callback?error=access_denied")
        .cookie(state)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

#[actix_rt::test]
async fn test_second_google_sign_in_keeps_first_role() {
    let ctx = TestContext::new();
    let app = create_test_app(&ctx).await;

    for role in ["admin", "user"] {
        let (state, role_cookie) = start_sign_in(&app, Some(role)).await;
        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/v1/auth/google/callback?code={}&state={}",
                google_code("g-104"),
                state.value()
            ))
            .cookie(state.clone())
            .cookie(role_cookie)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 302);
    }

    let profile = ctx.profiles.get_profile("google:g-104").await.unwrap().unwrap();
    assert_eq!(profile.role.as_str(), "admin");
}
