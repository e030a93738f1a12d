//! Google OAuth 2.0 authorization-code client.
//!
//! Builds the consent-screen redirect and exchanges the returned code for
//! the user's OpenID profile.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::GoogleOAuthSettings;
use crate::error::{AppError, AppResult};
use crate::models::Identity;
use crate::services::identity::OAuthProvider;

/// HTTP connect timeout for Google API calls.
const HTTP_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
/// HTTP total timeout for Google API calls.
const HTTP_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const SCOPES: &str = "openid email profile";

/// Build an HTTP client with the provider timeouts.
pub(crate) fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AppError::Transport(format!("Failed to build HTTP client: {}", e)))
}

pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    redirect_url: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuthClient {
    pub fn new(settings: &GoogleOAuthSettings) -> AppResult<Self> {
        let client_id = settings.client_id.clone().ok_or_else(|| {
            AppError::InvalidInput("Google OAuth client ID not configured".to_string())
        })?;
        let client_secret = settings.client_secret.clone().ok_or_else(|| {
            AppError::InvalidInput("Google OAuth client secret not configured".to_string())
        })?;

        Ok(Self {
            http: build_http_client()?,
            client_id,
            client_secret,
            redirect_url: settings.redirect_url.clone(),
            auth_url: settings.auth_url.clone(),
            token_url: settings.token_url.clone(),
            userinfo_url: settings.userinfo_url.clone(),
        })
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuthClient {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&prompt=select_account",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> AppResult<Identity> {
        let form = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self.http.post(&self.token_url).form(&form).send().await?;
        let status = response.status();
        let token: TokenResponse = response.json().await.map_err(|e| {
            warn!("Google OAuth: failed to parse token response: {}", e);
            AppError::Unauthorized("Google authentication failed".to_string())
        })?;

        if let Some(ref err) = token.error {
            warn!(%status, "Google OAuth: token endpoint returned error: {}", err);
            return Err(AppError::Unauthorized(
                "Google authentication failed".to_string(),
            ));
        }

        let access_token: SecretString =
            token.access_token.map(SecretString::from).ok_or_else(|| {
                warn!("Google OAuth: no access_token in response");
                AppError::Unauthorized("Google authentication failed".to_string())
            })?;

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Google OAuth: userinfo request rejected");
            return Err(AppError::Unauthorized(
                "Google authentication failed".to_string(),
            ));
        }

        let user: GoogleUserInfo = response.json().await.map_err(|e| {
            warn!("Google OAuth: failed to parse user info: {}", e);
            AppError::Unauthorized("Google authentication failed".to_string())
        })?;

        info!(sub = %user.sub, "Google account verified");
        Ok(Identity::google(&user.sub, user.email, user.name, user.picture))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// OpenID Connect userinfo claims.
#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}
