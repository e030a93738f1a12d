//! Auth event broadcaster.
//!
//! Fans identity-state transitions out to role observers and WebSocket
//! sessions through `tokio::sync::broadcast`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::broadcast;

use crate::models::{AuthEvent, AuthEventKind};

/// Default capacity for the broadcast channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Publishes auth events with a strictly increasing sequence number.
#[derive(Clone)]
pub struct AuthEventBroadcaster {
    sender: broadcast::Sender<AuthEvent>,
    seq: Arc<AtomicU64>,
}

impl AuthEventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Receiver for all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Stamp and broadcast an event for every session of `uid`.
    /// Having no subscribers is not an error.
    pub fn publish(&self, uid: &str, kind: AuthEventKind) -> AuthEvent {
        self.emit(uid, None, kind)
    }

    /// Stamp and broadcast an event caused by one session of `uid`.
    pub fn publish_for_session(&self, uid: &str, session_id: &str, kind: AuthEventKind) -> AuthEvent {
        self.emit(uid, Some(session_id.to_string()), kind)
    }

    fn emit(&self, uid: &str, session_id: Option<String>, kind: AuthEventKind) -> AuthEvent {
        let event = AuthEvent {
            seq: self.seq.fetch_add(1, Ordering::SeqCst) + 1,
            uid: uid.to_string(),
            kind,
            session_id,
            at: Utc::now(),
        };

        let receivers = self.sender.send(event.clone()).unwrap_or(0);
        tracing::debug!(seq = event.seq, uid = %event.uid, kind = ?event.kind, receivers, "Auth event published");

        event
    }

    /// Sequence number of the most recent event, 0 before any.
    pub fn last_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }
}

impl Default for AuthEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
