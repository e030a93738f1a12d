//! Role observation.
//!
//! A `RoleObserver` follows auth events and keeps a [`RoleSnapshot`] of the
//! observed user's profile in a `watch` channel. Every relevant event
//! triggers one profile fetch; fetches are tagged with the event sequence
//! number and a result is only published if no newer event arrived while it
//! was in flight.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::{AuthEvent, AuthEventKind, RoleSnapshot, UserProfile};
use crate::services::auth_events::AuthEventBroadcaster;
use crate::services::profile_store::ProfileStore;

/// Which events an observer reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverScope {
    /// Track whichever user signed in most recently.
    All,
    /// Track one session of a uid. Sign-outs from the user's other sessions
    /// are ignored.
    Session { uid: String, session_id: String },
}

impl ObserverScope {
    fn matches(&self, uid: &str) -> bool {
        match self {
            Self::All => true,
            Self::Session { uid: scoped, .. } => scoped == uid,
        }
    }

    /// Whether a sign-out event ends what this observer tracks.
    fn ends_with(&self, event: &AuthEvent) -> bool {
        match (self, event.session_id.as_deref()) {
            (Self::Session { session_id, .. }, Some(ended)) => session_id == ended,
            _ => true,
        }
    }
}

type FetchResult = (u64, String, AppResult<Option<UserProfile>>);

pub struct RoleObserver {
    rx: watch::Receiver<RoleSnapshot>,
    task: JoinHandle<()>,
}

impl RoleObserver {
    /// Observe every sign-in/sign-out, starting signed out.
    pub fn spawn(store: Arc<dyn ProfileStore>, events: &AuthEventBroadcaster) -> Self {
        Self::start(store, events, ObserverScope::All, None)
    }

    /// Observe one session of an already signed-in user, fetching their
    /// profile right away.
    pub fn for_session(
        store: Arc<dyn ProfileStore>,
        events: &AuthEventBroadcaster,
        uid: &str,
        session_id: &str,
    ) -> Self {
        Self::start(
            store,
            events,
            ObserverScope::Session {
                uid: uid.to_string(),
                session_id: session_id.to_string(),
            },
            Some(uid.to_string()),
        )
    }

    fn start(
        store: Arc<dyn ProfileStore>,
        events: &AuthEventBroadcaster,
        scope: ObserverScope,
        initial_uid: Option<String>,
    ) -> Self {
        let event_rx = events.subscribe();
        let seq = events.last_seq();

        let initial = match initial_uid.as_deref() {
            Some(uid) => RoleSnapshot::loading(seq, uid),
            None => RoleSnapshot::signed_out(seq),
        };
        let (tx, rx) = watch::channel(initial);

        let state = ObserverState {
            store,
            scope,
            tx,
            current_uid: initial_uid,
            latest_seq: seq,
        };
        let task = tokio::spawn(state.run(event_rx));

        Self { rx, task }
    }

    /// Receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<RoleSnapshot> {
        self.rx.clone()
    }

    /// Latest snapshot.
    pub fn current(&self) -> RoleSnapshot {
        self.rx.borrow().clone()
    }
}

impl Drop for RoleObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct ObserverState {
    store: Arc<dyn ProfileStore>,
    scope: ObserverScope,
    tx: watch::Sender<RoleSnapshot>,
    current_uid: Option<String>,
    latest_seq: u64,
}

impl ObserverState {
    async fn run(mut self, mut events: broadcast::Receiver<AuthEvent>) {
        let mut fetches: JoinSet<FetchResult> = JoinSet::new();

        if let Some(uid) = self.current_uid.clone() {
            self.fetch(&mut fetches, uid);
        }

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => self.on_event(event, &mut fetches),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Role observer lagged behind auth events");
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(joined) = fetches.join_next(), if !fetches.is_empty() => match joined {
                    Ok((seq, uid, result)) => self.on_fetched(seq, uid, result),
                    Err(e) => warn!("Profile fetch task failed: {}", e),
                },
            }
        }

        debug!("Role observer stopped");
    }

    fn on_event(&mut self, event: AuthEvent, fetches: &mut JoinSet<FetchResult>) {
        if !self.scope.matches(&event.uid) {
            return;
        }
        let is_current = self.current_uid.as_deref() == Some(event.uid.as_str());

        match event.kind {
            AuthEventKind::SignedIn => {
                self.latest_seq = event.seq;
                self.current_uid = Some(event.uid.clone());
                self.tx
                    .send_replace(RoleSnapshot::loading(event.seq, &event.uid));
                self.fetch(fetches, event.uid);
            }
            AuthEventKind::SignedOut if is_current && self.scope.ends_with(&event) => {
                self.latest_seq = event.seq;
                self.current_uid = None;
                self.tx.send_replace(RoleSnapshot::signed_out(event.seq));
            }
            AuthEventKind::ProfileChanged if is_current => {
                self.latest_seq = event.seq;
                self.fetch(fetches, event.uid);
            }
            _ => {}
        }
    }

    fn fetch(&self, fetches: &mut JoinSet<FetchResult>, uid: String) {
        let store = self.store.clone();
        let seq = self.latest_seq;
        fetches.spawn(async move {
            let result = store.get(&uid).await;
            (seq, uid, result)
        });
    }

    fn on_fetched(&mut self, seq: u64, uid: String, result: AppResult<Option<UserProfile>>) {
        if seq != self.latest_seq {
            debug!(seq, latest = self.latest_seq, uid = %uid, "Discarding stale profile fetch");
            return;
        }

        let snapshot = match result {
            Ok(profile) => RoleSnapshot {
                seq,
                uid: Some(uid),
                profile,
                loading: false,
                error: None,
            },
            Err(e) => {
                warn!(uid = %uid, "Profile fetch failed: {}", e);
                RoleSnapshot {
                    seq,
                    uid: Some(uid),
                    profile: None,
                    loading: false,
                    error: Some(e.to_string()),
                }
            }
        };
        self.tx.send_replace(snapshot);
    }
}
