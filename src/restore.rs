//! Startup session restore.
//!
//! On app start the durable snapshot is loaded, then a stored credential is
//! re-validated against the identity service. Any failure ends the session;
//! there is no retry. The loading flag is cleared on every exit path,
//! including when the restore future is dropped mid-flight.

use tracing::{debug, info, warn};

use crate::identity::IdentityService;
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing to restore.
    NoCredential,
    /// Identity service confirmed the credential; profile refreshed.
    Restored { user_id: String },
    /// Credential rejected or service unreachable; session cleared.
    Invalidated,
    /// The credential changed (logout or a new login) while the call was in
    /// flight; the result was discarded.
    Superseded,
}

/// Clears `is_loading` when dropped.
struct LoadingFlag<'a> {
    store: &'a SessionStore,
}

impl<'a> LoadingFlag<'a> {
    fn raise(store: &'a SessionStore) -> Self {
        store.set_loading(true);
        Self { store }
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}

/// Re-validate the stored credential and refresh the user.
///
/// Hydrates the store first if nobody has yet, so the credential read below
/// always sees the durable snapshot.
pub async fn restore_session<I>(store: &SessionStore, identity: &I) -> RestoreOutcome
where
    I: IdentityService,
{
    if !store.session().is_hydrated() {
        debug!("Restore requested before hydration, hydrating now");
        store.rehydrate();
    }

    let Some(credential) = store.credential() else {
        debug!("No stored credential, skipping restore");
        return RestoreOutcome::NoCredential;
    };

    let _loading = LoadingFlag::raise(store);

    match identity.current_user(&credential).await {
        Ok(user) => {
            let user_id = user.id.clone();
            if store.set_user_for_credential(&credential, user) {
                info!(user_id = %user_id, "Session restored");
                RestoreOutcome::Restored { user_id }
            } else {
                debug!("Credential changed during restore, discarding profile");
                RestoreOutcome::Superseded
            }
        }
        Err(e) => {
            if store.logout_if_credential(&credential) {
                warn!(error = %e, "Session restore failed, session cleared");
                RestoreOutcome::Invalidated
            } else {
                debug!(error = %e, "Session restore failed after credential changed");
                RestoreOutcome::Superseded
            }
        }
    }
}

/// Root app shell start-up: hydrate, then restore.
pub async fn bootstrap<I>(store: &SessionStore, identity: &I) -> RestoreOutcome
where
    I: IdentityService,
{
    store.rehydrate();
    restore_session(store, identity).await
}
