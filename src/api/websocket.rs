//! WebSocket role stream.
//!
//! A signed-in browser connects to `/auth/ws` and receives a JSON
//! `RoleSnapshot` for its own uid immediately and again after every
//! sign-in, sign-out or role change. The session cookie is checked before
//! the upgrade so unauthenticated requests get a plain HTTP 401.

use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::Message;
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::{AuthError, SessionUser};
use crate::error::ErrorResponse;
use crate::models::RoleSnapshot;
use crate::services::{IdentityGateway, ProfileService, RoleObserver};

/// Ping interval for keeping connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for receiving pong response.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticate, then upgrade to a WebSocket streaming role snapshots.
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    session: Result<SessionUser, AuthError>,
    gateway: web::Data<IdentityGateway>,
    profiles: web::Data<ProfileService>,
) -> Result<HttpResponse, actix_web::Error> {
    let user = match session {
        Ok(user) => user,
        Err(auth_err) => {
            warn!(
                client = %req.connection_info().realip_remote_addr().unwrap_or("unknown"),
                "WebSocket authentication failed"
            );
            return Ok(HttpResponse::Unauthorized().json(ErrorResponse {
                error: "UNAUTHORIZED".to_string(),
                message: auth_err.to_string(),
            }));
        }
    };

    let client_addr = req
        .connection_info()
        .realip_remote_addr()
        .map(String::from)
        .unwrap_or_else(|| "unknown".to_string());

    let (response, ws_session, msg_stream) = actix_ws::handle(&req, stream)?;

    info!(client = %client_addr, uid = %user.uid, "WebSocket connection established");

    let observer = RoleObserver::for_session(
        profiles.store(),
        gateway.events(),
        &user.uid,
        &user.session_id,
    );
    actix_web::rt::spawn(handle_websocket_connection(
        ws_session,
        msg_stream,
        observer,
        client_addr,
    ));

    Ok(response)
}

async fn send_snapshot(session: &mut actix_ws::Session, snapshot: &RoleSnapshot) -> bool {
    match serde_json::to_string(snapshot) {
        Ok(json) => session.text(json).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize role snapshot");
            true
        }
    }
}

/// Handles an individual WebSocket connection.
async fn handle_websocket_connection(
    mut session: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    observer: RoleObserver,
    client_addr: String,
) {
    let mut rx: watch::Receiver<RoleSnapshot> = observer.subscribe();

    let initial = rx.borrow_and_update().clone();
    if !send_snapshot(&mut session, &initial).await {
        return;
    }

    let mut last_pong = Instant::now();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);

    loop {
        tokio::select! {
            Some(msg_result) = msg_stream.next() => {
                match msg_result {
                    Ok(Message::Ping(bytes)) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Pong(_)) => {
                        last_pong = Instant::now();
                    }
                    Ok(Message::Text(text)) => {
                        debug!(client = %client_addr, message = %text, "Ignoring client text message");
                    }
                    Ok(Message::Close(reason)) => {
                        info!(client = %client_addr, reason = ?reason, "Client requested close");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(client = %client_addr, error = %e, "WebSocket message error");
                        break;
                    }
                }
            }

            changed = rx.changed() => {
                if changed.is_err() {
                    info!(client = %client_addr, "Role observer stopped");
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                if !send_snapshot(&mut session, &snapshot).await {
                    warn!(client = %client_addr, "Failed to send snapshot, closing connection");
                    break;
                }
            }

            _ = ping_interval.tick() => {
                if last_pong.elapsed() > PING_INTERVAL + PONG_TIMEOUT {
                    warn!(client = %client_addr, "Pong timeout, closing connection");
                    break;
                }
                if session.ping(b"").await.is_err() {
                    warn!(client = %client_addr, "Failed to send ping, closing connection");
                    break;
                }
            }
        }
    }

    drop(observer);
    let _ = session.close(None).await;
    info!(client = %client_addr, "WebSocket connection closed");
}

/// Configure WebSocket routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/auth/ws").route(web::get().to(websocket_handler)));
}
