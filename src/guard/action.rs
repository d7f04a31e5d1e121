//! Per-action authentication gate.
//!
//! Unlike a route guard the page keeps rendering; only the single action
//! (favorite, add to cart, follow shop) is blocked.

use std::sync::Arc;

use tracing::debug;

use crate::config::RoutesConfig;
use crate::events::{AppEvent, Notice};
use crate::navigation::{Navigation, Navigator, login_redirect};
use crate::session::SessionStore;

/// Toast shown when an anonymous visitor tries a gated action.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Silakan masuk terlebih dahulu";

#[derive(Clone)]
pub struct AuthGate {
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    routes: RoutesConfig,
}

impl AuthGate {
    pub fn new(store: SessionStore, navigator: Arc<dyn Navigator>, routes: RoutesConfig) -> Self {
        Self {
            store,
            navigator,
            routes,
        }
    }

    /// Run `action` if authenticated and return `true`. Otherwise publish a
    /// notice, push `/login?redirect=<path>` (current path when
    /// `redirect_path` is `None`) and return `false` without running it.
    pub fn require_auth<F>(&self, action: F, redirect_path: Option<&str>) -> bool
    where
        F: FnOnce(),
    {
        if self.store.is_authenticated() {
            action();
            return true;
        }

        let return_to = redirect_path
            .map(str::to_string)
            .unwrap_or_else(|| self.navigator.current_path());
        let target = login_redirect(&self.routes.login, &return_to);

        self.store
            .events()
            .publish(AppEvent::Notice(Notice::new(LOGIN_REQUIRED_MESSAGE)));
        debug!(redirect = %target, "Action requires login");
        self.navigator.navigate(Navigation::push(target));
        false
    }
}
