//! HTTP API test suite.
//!
//! Runs the full actix app against the in-memory profile store with fake
//! Google and SMS providers. No network or database is needed.
//!
//! Run with: cargo test --test api

mod fake_providers;
mod test_helpers;

mod test_google_sign_in;
mod test_role_admin;
mod test_session;
