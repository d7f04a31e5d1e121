//! Persisted session store.
//!
//! State lives in a `watch` channel: every operation is one atomic
//! replacement of the whole `Session`, observers only ever see complete
//! states, and guards can await changes. Whenever an operation changes the
//! durable subset, the snapshot is written to storage under the same lock,
//! so storage order always matches state order. Logout always writes the
//! cleared snapshot, even when memory held nothing to clear.
//!
//! Hydration happens once per process. Identity set before it (a login or
//! logout on a cold store) takes precedence over the stored snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{DurableSnapshot, HydrationPhase, PersistedEnvelope, SNAPSHOT_VERSION, Session};
use super::user::{User, UserPatch};
use crate::config::StoreConfig;
use crate::events::{AppEvent, EventBus};
use crate::storage::SessionStorage;

/// Cloneable handle; clones share the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<Session>,
    storage: Arc<dyn SessionStorage>,
    events: EventBus,
    storage_key: String,
    /// Identity was written while not yet hydrated.
    identity_set_early: AtomicBool,
}

impl SessionStore {
    /// Create an empty, cold store. Nothing is read from storage until
    /// [`SessionStore::rehydrate`] is called.
    pub fn new(storage: Arc<dyn SessionStorage>, events: EventBus, config: StoreConfig) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            inner: Arc::new(Inner {
                state,
                storage,
                events,
                storage_key: config.storage_key,
                identity_set_early: AtomicBool::new(false),
            }),
        }
    }

    /// Copy of the current state.
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is notified after every state replacement.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    pub fn phase(&self) -> HydrationPhase {
        self.inner.state.borrow().phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn credential(&self) -> Option<String> {
        self.inner.state.borrow().credential.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Set user and credential together and clear the loading flag.
    pub fn login(&self, user: User, credential: impl Into<String>) {
        let credential = credential.into();
        let user_id = user.id.clone();
        self.mutate(move |session| {
            self.note_identity_write(session);
            session.user = Some(user);
            session.credential = Some(credential);
            session.is_loading = false;
            true
        });
        info!(user_id = %user_id, "Logged in");
    }

    /// Clear identity fields and broadcast `LoggedOut`.
    ///
    /// The broadcast fires on every call, including when nobody was logged in.
    pub fn logout(&self) {
        let was_authenticated = self.is_authenticated();
        self.inner.state.send_if_modified(|session| {
            self.note_identity_write(session);
            let changed = clear_identity(session);
            self.write_snapshot(session.durable());
            changed
        });
        let listeners = self.inner.events.publish(AppEvent::LoggedOut);
        info!(was_authenticated, listeners, "Logged out");
    }

    pub fn set_user(&self, user: Option<User>) {
        self.mutate(move |session| {
            self.note_identity_write(session);
            if session.user == user {
                return false;
            }
            session.user = user;
            true
        });
    }

    pub fn set_credential(&self, credential: Option<String>) {
        self.mutate(move |session| {
            self.note_identity_write(session);
            if session.credential == credential {
                return false;
            }
            session.credential = credential;
            true
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.mutate(move |session| {
            if session.is_loading == loading {
                return false;
            }
            session.is_loading = loading;
            true
        });
    }

    /// Shallow-merge `patch` into the current user. Returns `false` when
    /// there is no user or nothing changed.
    pub fn update_user(&self, patch: UserPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        self.mutate(move |session| {
            if session.user.is_none() {
                debug!("Profile update ignored, no user");
                return false;
            }
            self.note_identity_write(session);
            let Some(user) = session.user.as_mut() else {
                return false;
            };
            let before = user.clone();
            user.apply(patch);
            *user != before
        })
    }

    /// Load the durable snapshot into memory and mark the store hydrated.
    ///
    /// Returns whether a snapshot was applied. Only the first call per
    /// process reads storage; later calls leave the live state alone. If
    /// identity was set before hydration, the snapshot is not applied and
    /// the current identity is written over it instead.
    pub fn rehydrate(&self) -> bool {
        let started = self.inner.state.send_if_modified(|session| {
            if session.phase == HydrationPhase::Cold {
                session.phase = HydrationPhase::Hydrating;
                true
            } else {
                false
            }
        });
        if !started {
            debug!("Session already hydrated, keeping live state");
            return false;
        }

        let mut found = false;
        self.inner.state.send_modify(|session| {
            if self.inner.identity_set_early.load(Ordering::SeqCst) {
                debug!("Identity set before hydration, skipping stored snapshot");
                self.write_snapshot(session.durable());
            } else if let Some(snapshot) = self.read_snapshot() {
                session.user = snapshot.user;
                session.credential = snapshot.credential;
                found = true;
            }
            session.phase = HydrationPhase::Hydrated;
        });

        debug!(found, "Session rehydrated");
        found
    }

    /// Replace the user only while `credential` is still the stored one.
    /// A logout or a fresh login that happened in the meantime wins.
    pub(crate) fn set_user_for_credential(&self, credential: &str, user: User) -> bool {
        self.mutate(move |session| {
            if session.credential.as_deref() != Some(credential) {
                return false;
            }
            session.user = Some(user);
            true
        })
    }

    /// Logout, but only while `credential` is still the stored one.
    pub(crate) fn logout_if_credential(&self, credential: &str) -> bool {
        let mut matched = false;
        self.inner.state.send_if_modified(|session| {
            if session.credential.as_deref() != Some(credential) {
                return false;
            }
            matched = true;
            self.note_identity_write(session);
            let changed = clear_identity(session);
            self.write_snapshot(session.durable());
            changed
        });
        if matched {
            let listeners = self.inner.events.publish(AppEvent::LoggedOut);
            info!(listeners, "Session invalidated");
        }
        matched
    }

    /// Apply `op` as one state replacement. `op` returns whether it changed
    /// anything; observers are only notified when it did.
    fn mutate<F>(&self, op: F) -> bool
    where
        F: FnOnce(&mut Session) -> bool,
    {
        self.inner.state.send_if_modified(|session| {
            let before = session.durable();
            if !op(session) {
                return false;
            }
            let after = session.durable();
            if after != before {
                self.write_snapshot(after);
            }
            true
        })
    }

    fn note_identity_write(&self, session: &Session) {
        if !session.is_hydrated() {
            self.inner.identity_set_early.store(true, Ordering::SeqCst);
        }
    }

    fn read_snapshot(&self) -> Option<DurableSnapshot> {
        let raw = match self.inner.storage.load(&self.inner.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.inner.storage_key, error = %e, "Failed to read session snapshot");
                return None;
            }
        };

        match serde_json::from_str::<PersistedEnvelope>(&raw) {
            Ok(envelope) if envelope.version <= SNAPSHOT_VERSION => Some(envelope.state),
            Ok(envelope) => {
                warn!(
                    version = envelope.version,
                    "Ignoring session snapshot from a newer version"
                );
                None
            }
            Err(e) => {
                warn!(key = %self.inner.storage_key, error = %e, "Ignoring unreadable session snapshot");
                None
            }
        }
    }

    fn write_snapshot(&self, snapshot: DurableSnapshot) {
        let json = match serde_json::to_string(&PersistedEnvelope::new(snapshot)) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize session snapshot");
                return;
            }
        };
        if let Err(e) = self.inner.storage.save(&self.inner.storage_key, &json) {
            warn!(key = %self.inner.storage_key, error = %e, "Failed to persist session snapshot");
        }
    }
}

fn clear_identity(session: &mut Session) -> bool {
    let changed = session.user.is_some() || session.credential.is_some() || session.is_loading;
    session.user = None;
    session.credential = None;
    session.is_loading = false;
    changed
}
