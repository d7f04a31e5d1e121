//! Client-side session lifecycle and route access control for the lapak
//! storefront.
//!
//! - [`session::SessionStore`] holds the user and credential, persists the
//!   durable subset and exposes an explicit hydration phase.
//! - [`restore`] re-validates a stored credential against an
//!   [`identity::IdentityService`] at start-up.
//! - [`capability::resolve`] maps a user to what they may do.
//! - [`guard`] decides, per page or per action, whether to render, wait or
//!   redirect.
//!
//! Collaborators (storage, identity, navigation, notifications) are traits
//! or handles injected at construction, so tests build isolated instances.

pub mod capability;
pub mod cli;
pub mod config;
pub mod events;
pub mod guard;
pub mod identity;
pub mod navigation;
pub mod restore;
pub mod session;
pub mod storage;

use std::sync::Arc;

use config::{RoutesConfig, StoreConfig};
use events::EventBus;
use guard::AuthGate;
use navigation::Navigator;
use session::SessionStore;
use storage::SessionStorage;

/// Everything the app shell wires together at start-up.
#[derive(Clone)]
pub struct SessionContext {
    pub store: SessionStore,
    pub events: EventBus,
    pub routes: RoutesConfig,
    pub navigator: Arc<dyn Navigator>,
}

impl SessionContext {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
        store_config: StoreConfig,
        routes: RoutesConfig,
    ) -> Self {
        let events = EventBus::new();
        let store = SessionStore::new(storage, events.clone(), store_config);
        Self {
            store,
            events,
            routes,
            navigator,
        }
    }

    /// Action-level gate bound to this context.
    pub fn auth_gate(&self) -> AuthGate {
        AuthGate::new(
            self.store.clone(),
            self.navigator.clone(),
            self.routes.clone(),
        )
    }
}
