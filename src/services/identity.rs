//! Identity provider gateway.
//!
//! Wraps the Google OAuth and SMS verification providers behind one surface
//! and publishes sign-in/sign-out transitions to the auth event broadcaster.
//!
//! Phone verification is two-step. `send_phone_code` returns an opaque,
//! signed confirmation handle bound to the phone number and the provider's
//! verification id; `confirm_phone_code` takes that handle plus the SMS code.
//! The handle is an HS256 JWT so no server-side state is kept between steps.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{AuthEvent, AuthEventKind, Identity, PhoneConfirmationClaims};
use crate::services::auth_events::AuthEventBroadcaster;
use crate::services::google_oauth::GoogleOAuthClient;
use crate::services::twilio_verify::TwilioVerifyClient;

/// Issuer for tokens minted by this service.
pub const TOKEN_ISSUER: &str = "rolegate";
const CONFIRMATION_PURPOSE: &str = "phone_confirmation";

const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;
const MIN_CODE_LEN: usize = 4;
const MAX_CODE_LEN: usize = 10;

/// OAuth authorization-code provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Consent-screen URL carrying the CSRF `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange the callback code for the authenticated identity.
    async fn exchange_code(&self, code: &str) -> AppResult<Identity>;
}

/// SMS one-time-code provider.
#[async_trait]
pub trait PhoneVerifier: Send + Sync {
    /// Send a code to an E.164 number; returns the provider's verification id.
    async fn send_code(&self, phone_number: &str) -> AppResult<String>;

    /// Check a code against the verification `send_code` returned.
    /// `Ok(false)` when the code is wrong or the verification is gone.
    async fn check_code(&self, verification_sid: &str, code: &str) -> AppResult<bool>;
}

/// Redirect target and CSRF state for a Google sign-in.
#[derive(Debug, Clone)]
pub struct GoogleSignInStart {
    pub authorize_url: String,
    pub state: String,
}

/// Handle returned after a code has been sent.
#[derive(Debug, Clone)]
pub struct PhoneConfirmation {
    pub handle: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct IdentityGateway {
    google: Option<Arc<dyn OAuthProvider>>,
    phone: Option<Arc<dyn PhoneVerifier>>,
    events: AuthEventBroadcaster,
    secret: SecretString,
    confirmation_ttl_secs: u64,
}

impl IdentityGateway {
    /// Gateway with no providers attached.
    pub fn new(events: AuthEventBroadcaster, secret: SecretString, confirmation_ttl_secs: u64) -> Self {
        Self {
            google: None,
            phone: None,
            events,
            secret,
            confirmation_ttl_secs,
        }
    }

    pub fn with_google(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.google = Some(provider);
        self
    }

    pub fn with_phone(mut self, verifier: Arc<dyn PhoneVerifier>) -> Self {
        self.phone = Some(verifier);
        self
    }

    /// Attach the providers enabled in configuration.
    pub fn from_config(config: &Config, events: AuthEventBroadcaster) -> AppResult<Self> {
        let mut gateway = Self::new(
            events,
            config.session.secret.clone(),
            config.phone_auth.confirmation_ttl_secs,
        );

        if config.google_oauth.enabled {
            gateway = gateway.with_google(Arc::new(GoogleOAuthClient::new(&config.google_oauth)?));
            info!("Google sign-in enabled");
        }
        if config.phone_auth.enabled {
            gateway = gateway.with_phone(Arc::new(TwilioVerifyClient::new(&config.phone_auth)?));
            info!("Phone sign-in enabled");
        }

        Ok(gateway)
    }

    pub fn google_enabled(&self) -> bool {
        self.google.is_some()
    }

    pub fn phone_enabled(&self) -> bool {
        self.phone.is_some()
    }

    fn google(&self) -> AppResult<&Arc<dyn OAuthProvider>> {
        self.google
            .as_ref()
            .ok_or_else(|| AppError::InvalidInput("Google sign-in is not configured".to_string()))
    }

    fn phone(&self) -> AppResult<&Arc<dyn PhoneVerifier>> {
        self.phone
            .as_ref()
            .ok_or_else(|| AppError::InvalidInput("Phone sign-in is not configured".to_string()))
    }

    pub fn begin_google_sign_in(&self) -> AppResult<GoogleSignInStart> {
        let state = generate_random_hex();
        let authorize_url = self.google()?.authorization_url(&state);
        Ok(GoogleSignInStart {
            authorize_url,
            state,
        })
    }

    pub async fn complete_google_sign_in(&self, code: &str) -> AppResult<Identity> {
        let provider = self.google()?;
        if code.is_empty() {
            return Err(AppError::Unauthorized(
                "Missing authorization code".to_string(),
            ));
        }
        provider.exchange_code(code).await
    }

    pub async fn send_phone_code(&self, phone_number: &str) -> AppResult<PhoneConfirmation> {
        let verifier = self.phone()?;
        let phone_number = normalize_phone_number(phone_number)?;

        let sid = verifier.send_code(&phone_number).await?;
        self.sign_confirmation(&phone_number, &sid, Utc::now())
    }

    pub async fn confirm_phone_code(&self, handle: &str, code: &str) -> AppResult<Identity> {
        let verifier = self.phone()?;
        if handle.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Please send a verification code first".to_string(),
            ));
        }
        let code = validate_code(code)?;
        let claims = self.verify_confirmation(handle)?;

        if !verifier.check_code(&claims.sid, code).await? {
            warn!(sid = %claims.sid, "Phone verification code rejected");
            return Err(AppError::Unauthorized(
                "Invalid verification code".to_string(),
            ));
        }

        Ok(Identity::phone(&claims.sub))
    }

    pub fn signed_in(&self, uid: &str) -> AuthEvent {
        self.events.publish(uid, AuthEventKind::SignedIn)
    }

    /// Sign out one session. Other sessions of the same user stay signed in.
    pub fn sign_out(&self, uid: &str, session_id: &str) -> AuthEvent {
        self.events
            .publish_for_session(uid, session_id, AuthEventKind::SignedOut)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &AuthEventBroadcaster {
        &self.events
    }

    fn sign_confirmation(
        &self,
        phone_number: &str,
        sid: &str,
        now: DateTime<Utc>,
    ) -> AppResult<PhoneConfirmation> {
        let expires_at = now + Duration::seconds(self.confirmation_ttl_secs as i64);
        let claims = PhoneConfirmationClaims {
            sub: phone_number.to_string(),
            sid: sid.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            purpose: CONFIRMATION_PURPOSE.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let handle = encode(&Header::default(), &claims, &key).map_err(|e| {
            AppError::InvalidInput(format!("Failed to create confirmation handle: {}", e))
        })?;

        Ok(PhoneConfirmation { handle, expires_at })
    }

    fn verify_confirmation(&self, handle: &str) -> AppResult<PhoneConfirmationClaims> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.validate_aud = false;

        let claims = decode::<PhoneConfirmationClaims>(handle, &key, &validation)
            .map_err(|e| {
                warn!("Rejected phone confirmation handle: {}", e);
                AppError::Unauthorized("Verification expired, please request a new code".to_string())
            })?
            .claims;

        if claims.purpose != CONFIRMATION_PURPOSE {
            return Err(AppError::Unauthorized(
                "Invalid confirmation handle".to_string(),
            ));
        }
        Ok(claims)
    }
}

/// Generate a cryptographically random string.
fn generate_random_hex() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

/// Strip formatting and check the number is E.164 with a country code.
pub fn normalize_phone_number(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "Please enter a phone number".to_string(),
        ));
    }
    if !trimmed.starts_with('+') {
        return Err(AppError::InvalidInput(
            "Phone number must include country code (e.g., +1234567890)".to_string(),
        ));
    }

    let digits: String = trimmed[1..]
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    let valid = digits.chars().all(|c| c.is_ascii_digit())
        && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
        && !digits.starts_with('0');
    if !valid {
        return Err(AppError::InvalidInput(format!(
            "'{}' is not a valid international phone number",
            trimmed
        )));
    }

    Ok(format!("+{}", digits))
}

/// Codes are short runs of ASCII digits.
pub fn validate_code(code: &str) -> AppResult<&str> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::InvalidInput(
            "Please enter the verification code".to_string(),
        ));
    }
    if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len())
        || !code.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AppError::InvalidInput(
            "Verification code must be numeric".to_string(),
        ));
    }
    Ok(code)
}
