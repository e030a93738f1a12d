//! Shared test helpers for the HTTP API tests.

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::{App, dev::ServiceResponse, test, web};
use rolegate_lib::auth::{AdminKey, SESSION_COOKIE};
use rolegate_lib::config::{
    Config, DatabaseSettings, Environment, GoogleOAuthSettings, PhoneAuthSettings,
    ProfileStoreKind, SessionSettings, defaults,
};
use rolegate_lib::models::{Identity, NewProfile, Role};
use rolegate_lib::services::{
    AuthEventBroadcaster, IdentityGateway, MemoryProfileStore, ProfileService, ProfileStore,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use uuid::Uuid;

use super::fake_providers::{FakeGoogle, FakeSms, VALID_SMS_CODE};

/// Admin key used in tests.
pub const TEST_ADMIN_KEY: &str = "test-admin-key-for-api-tests";

/// Where the Google callback redirects after sign-in.
pub const POST_LOGIN_REDIRECT: &str = "/dashboard";

pub fn test_config() -> Config {
    Config {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 0,
        profile_store: ProfileStoreKind::Memory,
        database: DatabaseSettings {
            url: defaults::DEV_DATABASE_URL.to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        admin_key: Some(SecretString::from(TEST_ADMIN_KEY)),
        session: SessionSettings {
            secret: SecretString::from("api-test-session-secret"),
            ttl_secs: 3600,
            post_login_redirect: POST_LOGIN_REDIRECT.to_string(),
        },
        google_oauth: GoogleOAuthSettings {
            enabled: true,
            client_id: Some("test-client".to_string()),
            client_secret: Some(SecretString::from("test-client-secret")),
            redirect_url: defaults::GOOGLE_REDIRECT_URL.to_string(),
            auth_url: defaults::GOOGLE_AUTH_URL.to_string(),
            token_url: defaults::GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: defaults::GOOGLE_USERINFO_URL.to_string(),
        },
        phone_auth: PhoneAuthSettings {
            enabled: true,
            account_sid: Some("ACtest".to_string()),
            auth_token: Some(SecretString::from("test-token")),
            verify_service_sid: Some("VAtest".to_string()),
            base_url: defaults::TWILIO_VERIFY_BASE_URL.to_string(),
            confirmation_ttl_secs: 600,
        },
    }
}

/// Everything a test needs besides the service itself.
pub struct TestContext {
    pub profiles: ProfileService,
    pub gateway: IdentityGateway,
    pub sms: Arc<FakeSms>,
}

impl TestContext {
    pub fn new() -> Self {
        let config = test_config();
        let events = AuthEventBroadcaster::new();
        let sms = Arc::new(FakeSms::default());
        let gateway = IdentityGateway::new(
            events.clone(),
            config.session.secret.clone(),
            config.phone_auth.confirmation_ttl_secs,
        )
        .with_google(Arc::new(FakeGoogle))
        .with_phone(sms.clone());
        let store: Arc<dyn ProfileStore> = Arc::new(MemoryProfileStore::new());

        Self {
            profiles: ProfileService::new(store, events),
            gateway,
            sms,
        }
    }

    /// Insert a profile directly, bypassing sign-in.
    pub async fn seed_profile(&self, sub: &str, role: Role) -> String {
        let identity = Identity::google(sub, Some(format!("{}@example.com", sub)), None, None);
        self.profiles
            .store()
            .create(NewProfile::from_identity(&identity, role))
            .await
            .expect("seed profile");
        identity.uid
    }
}

/// Create a test app wired like `main`.
pub async fn create_test_app(
    ctx: &TestContext,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
{
    let config = test_config();
    let admin_key = AdminKey::new(config.admin_key.clone());

    test::init_service(
        App::new()
            .app_data(web::Data::new(config))
            .app_data(web::Data::new(admin_key))
            .app_data(web::Data::new(ctx.gateway.clone()))
            .app_data(web::Data::new(ctx.profiles.clone()))
            .service(web::scope("/api/v1").configure(rolegate_lib::api::configure_api)),
    )
    .await
}

/// Random phone number in the +1 555 range.
pub fn unique_phone() -> String {
    let n = Uuid::new_v4().as_u128() % 10_000_000;
    format!("+1555{:07}", n)
}

/// Cookie named `name` set by a response, if any.
pub fn response_cookie(resp: &ServiceResponse, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.into_owned())
}

/// Send a code and confirm it. Returns the session cookie and the response body.
pub async fn sign_in_with_phone<S>(app: &S, phone: &str, role: Option<&str>) -> (Cookie<'static>, Value)
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/phone/send")
        .set_json(json!({ "phone_number": phone }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 200, "send code should succeed");
    let sent: Value = test::read_body_json(resp).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/phone/verify")
        .set_json(json!({
            "confirmation": sent["confirmation"],
            "code": VALID_SMS_CODE,
            "role": role,
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 200, "verify code should succeed");

    let cookie = response_cookie(&resp, SESSION_COOKIE).expect("session cookie");
    let body: Value = test::read_body_json(resp).await;
    (cookie, body)
}

/// `GET /auth/me` with an optional session cookie.
pub async fn get_me<S>(app: &S, session: Option<&Cookie<'static>>) -> Value
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let mut req = test::TestRequest::get().uri("/api/v1/auth/me");
    if let Some(cookie) = session {
        req = req.cookie(cookie.clone());
    }
    let resp = test::call_service(app, req.to_request()).await;
    assert_eq!(resp.status(), 200);
    test::read_body_json(resp).await
}

/// `PUT /users/{uid}/role` as the given caller. Returns status and body.
pub async fn put_role<S>(
    app: &S,
    uid: &str,
    role: &str,
    session: Option<&Cookie<'static>>,
    admin_key: Option<&str>,
) -> (u16, Value)
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let mut req = test::TestRequest::put()
        .uri(&format!("/api/v1/users/{}/role", uid))
        .set_json(json!({ "role": role }));
    if let Some(cookie) = session {
        req = req.cookie(cookie.clone());
    }
    if let Some(key) = admin_key {
        req = req.insert_header(("X-Admin-Key", key));
    }
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}
