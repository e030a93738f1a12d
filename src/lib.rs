//! Rolegate server library.
//!
//! Google and phone sign-in, per-user role profiles, and role observation
//! over a WebSocket.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
