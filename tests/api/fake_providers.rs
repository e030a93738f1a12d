//! In-process stand-ins for Google OAuth and the SMS provider.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rolegate_lib::error::{AppError, AppResult};
use rolegate_lib::models::Identity;
use rolegate_lib::services::{OAuthProvider, PhoneVerifier};

/// Code the fake SMS provider accepts.
pub const VALID_SMS_CODE: &str = "123456";

/// Accepts codes of the form `ok:<sub>`; anything else is rejected.
pub struct FakeGoogle;

/// Build a code the fake Google provider will accept for `sub`.
pub fn google_code(sub: &str) -> String {
    format!("ok:{}", sub)
}

#[async_trait]
impl OAuthProvider for FakeGoogle {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.google.test/o/oauth2/v2/auth?state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> AppResult<Identity> {
        match code.strip_prefix("ok:") {
            Some(sub) => Ok(Identity::google(
                sub,
                Some(format!("{}@example.com", sub)),
                Some(format!("User {}", sub)),
                Some("https://example.com/avatar.png".to_string()),
            )),
            None => Err(AppError::Unauthorized(
                "Google authentication failed".to_string(),
            )),
        }
    }
}

/// Records sent numbers and accepts [`VALID_SMS_CODE`] for verifications it issued.
#[derive(Default)]
pub struct FakeSms {
    pub sent: Mutex<Vec<String>>,
    pub checked: Mutex<Vec<String>>,
    next_sid: AtomicU64,
}

#[async_trait]
impl PhoneVerifier for FakeSms {
    async fn send_code(&self, phone_number: &str) -> AppResult<String> {
        self.sent.lock().unwrap().push(phone_number.to_string());
        Ok(format!("VE{}", self.next_sid.fetch_add(1, Ordering::SeqCst)))
    }

    async fn check_code(&self, verification_sid: &str, code: &str) -> AppResult<bool> {
        self.checked.lock().unwrap().push(verification_sid.to_string());
        let issued = verification_sid
            .strip_prefix("VE")
            .and_then(|n| n.parse::<u64>().ok())
            .is_some_and(|n| n < self.next_sid.load(Ordering::SeqCst));
        Ok(issued && code == VALID_SMS_CODE)
    }
}
