//! API endpoint modules.

pub mod auth;
pub mod health;
pub mod openapi;
pub mod users;
pub mod websocket;

use actix_web::web;

pub use auth::configure_routes as configure_auth_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use users::configure_routes as configure_user_routes;
pub use websocket::configure_routes as configure_websocket_routes;

/// Every `/api/v1` route.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_auth_routes)
        .configure(configure_websocket_routes)
        .configure(configure_user_routes);
}
