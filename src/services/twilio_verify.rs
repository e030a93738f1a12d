//! Twilio Verify client for SMS one-time codes.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::PhoneAuthSettings;
use crate::error::{AppError, AppResult};
use crate::services::google_oauth::build_http_client;
use crate::services::identity::PhoneVerifier;

pub struct TwilioVerifyClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: SecretString,
    service_sid: String,
    base_url: String,
}

impl TwilioVerifyClient {
    pub fn new(settings: &PhoneAuthSettings) -> AppResult<Self> {
        let missing =
            |name: &str| AppError::InvalidInput(format!("Twilio {} not configured", name));

        Ok(Self {
            http: build_http_client()?,
            account_sid: settings
                .account_sid
                .clone()
                .ok_or_else(|| missing("account SID"))?,
            auth_token: settings
                .auth_token
                .clone()
                .ok_or_else(|| missing("auth token"))?,
            service_sid: settings
                .verify_service_sid
                .clone()
                .ok_or_else(|| missing("Verify service SID"))?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn service_url(&self, resource: &str) -> String {
        format!(
            "{}/v2/Services/{}/{}",
            self.base_url, self.service_sid, resource
        )
    }
}

#[async_trait]
impl PhoneVerifier for TwilioVerifyClient {
    async fn send_code(&self, phone_number: &str) -> AppResult<String> {
        let response = self
            .http
            .post(self.service_url("Verifications"))
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("To", phone_number), ("Channel", "sms")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: TwilioErrorBody = response.json().await.unwrap_or_default();
            warn!(%status, code = ?body.code, "Twilio Verify rejected send: {}", body.message);
            return Err(match status {
                StatusCode::BAD_REQUEST => {
                    AppError::InvalidInput("Phone number was rejected by the SMS provider".to_string())
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    AppError::Unauthorized("Too many verification attempts".to_string())
                }
                _ => AppError::Transport(format!("SMS provider returned {}", status)),
            });
        }

        let verification: VerificationResponse = response.json().await?;
        info!(sid = %verification.sid, "Verification code sent");
        Ok(verification.sid)
    }

    async fn check_code(&self, verification_sid: &str, code: &str) -> AppResult<bool> {
        let response = self
            .http
            .post(self.service_url("VerificationCheck"))
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&check_form(verification_sid, code))
            .send()
            .await?;

        let status = response.status();
        // Twilio answers 404 once a verification has expired or been consumed
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            let body: TwilioErrorBody = response.json().await.unwrap_or_default();
            warn!(%status, code = ?body.code, "Twilio Verify rejected check: {}", body.message);
            return Err(AppError::Transport(format!(
                "SMS provider returned {}",
                status
            )));
        }

        let verification: VerificationResponse = response.json().await?;
        Ok(verification.status == "approved")
    }
}

/// Check by verification sid so a code only settles the verification it was sent for.
fn check_form<'a>(verification_sid: &'a str, code: &'a str) -> [(&'static str, &'a str); 2] {
    [("VerificationSid", verification_sid), ("Code", code)]
}

#[derive(Deserialize)]
struct VerificationResponse {
    sid: String,
    status: String,
}

#[derive(Deserialize, Default)]
struct TwilioErrorBody {
    code: Option<u32>,
    #[serde(default)]
    message: String,
}
