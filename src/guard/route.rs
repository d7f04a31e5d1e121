//! Page-level guard state machine.
//!
//! `Unknown → Allowed` renders the children, `Unknown → Denied` fires one
//! redirect and keeps showing the placeholder. `Denied` is terminal for
//! the lifetime of the guard; only a remount starts over.

use tokio::sync::watch;
use tracing::{debug, info};

use super::policy::{GuardPolicy, Placeholder, Render, Verdict};
use crate::config::RoutesConfig;
use crate::navigation::{Navigation, Navigator};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Unknown,
    Allowed,
    Denied { target: String },
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    policy: GuardPolicy,
    state: GuardState,
}

impl RouteGuard {
    pub fn new(policy: GuardPolicy) -> Self {
        Self {
            policy,
            state: GuardState::Unknown,
        }
    }

    pub fn basic(routes: &RoutesConfig) -> Self {
        Self::new(GuardPolicy::basic(routes))
    }

    pub fn enhanced(routes: &RoutesConfig) -> Self {
        Self::new(GuardPolicy::enhanced(routes))
    }

    pub fn admin(routes: &RoutesConfig) -> Self {
        Self::new(GuardPolicy::admin(routes))
    }

    pub fn public_only(routes: &RoutesConfig, redirect_to: Option<&str>) -> Self {
        Self::new(GuardPolicy::public_only(routes, redirect_to))
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Back to `Unknown`, as if the guarded page mounted again.
    pub fn remount(&mut self) {
        self.state = GuardState::Unknown;
    }

    /// Evaluate the latest session and return what to show. Fires the
    /// redirect on the transition into `Denied`, never again afterwards.
    pub fn observe(
        &mut self,
        session: &Session,
        current_path: &str,
        navigator: &dyn Navigator,
    ) -> Render {
        if let GuardState::Denied { .. } = self.state {
            return Render::Placeholder(Placeholder::Redirecting);
        }

        match self.policy.evaluate(session, current_path) {
            Verdict::Pending => {
                self.state = GuardState::Unknown;
                Render::Placeholder(Placeholder::Loading)
            }
            Verdict::Allowed => {
                if self.state != GuardState::Allowed {
                    debug!(guard = self.policy.name(), path = %current_path, "Access allowed");
                }
                self.state = GuardState::Allowed;
                Render::Children
            }
            Verdict::Denied { target } => {
                info!(
                    guard = self.policy.name(),
                    path = %current_path,
                    redirect = %target,
                    "Access denied, redirecting"
                );
                navigator.navigate(Navigation::replace(target.clone()));
                self.state = GuardState::Denied { target };
                Render::Placeholder(Placeholder::Redirecting)
            }
        }
    }

    /// Follow store changes until the guard leaves `Unknown`, then return
    /// the render for that first final answer. If the store is dropped
    /// first, returns the last placeholder.
    pub async fn until_settled(
        &mut self,
        receiver: &mut watch::Receiver<Session>,
        current_path: &str,
        navigator: &dyn Navigator,
    ) -> Render {
        loop {
            let session = receiver.borrow_and_update().clone();
            let render = self.observe(&session, current_path, navigator);
            if self.state != GuardState::Unknown {
                return render;
            }
            if receiver.changed().await.is_err() {
                return render;
            }
        }
    }
}
