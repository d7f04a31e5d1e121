//! One policy evaluator shared by every route guard.
//!
//! A policy is a requirement on the session plus where to send the user when
//! the requirement fails. Evaluation is pure; side effects (navigation) are
//! the caller's job.

use crate::capability::{self, Capability};
use crate::config::RoutesConfig;
use crate::navigation::login_redirect;
use crate::session::Session;

/// What the session must satisfy for the guarded content to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    /// Authenticated and holding the capability.
    Capability(Capability),
    /// Not authenticated (login and signup pages).
    Anonymous,
}

/// Where a denied visitor goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeniedTarget {
    /// Login, returning to the page being guarded.
    LoginReturningHere { login: String },
    /// Login returning to `return_to` when anonymous; `forbidden` when
    /// authenticated but short of the capability.
    LoginOrForbidden {
        login: String,
        return_to: String,
        forbidden: String,
    },
    Fixed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Loading or hydration still in flight; no final answer yet.
    Pending,
    Allowed,
    Denied { target: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Loading,
    Redirecting,
}

impl Placeholder {
    pub fn label(&self) -> &'static str {
        match self {
            Placeholder::Loading => "Memuat...",
            Placeholder::Redirecting => "Mengalihkan...",
        }
    }
}

/// What the guarded slot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    Children,
    Placeholder(Placeholder),
}

impl Render {
    pub fn shows_children(&self) -> bool {
        matches!(self, Render::Children)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    name: &'static str,
    /// Treat a cold (not yet hydrated) store as pending.
    awaits_hydration: bool,
    requirement: Requirement,
    on_denied: DeniedTarget,
}

impl GuardPolicy {
    pub fn new(
        name: &'static str,
        awaits_hydration: bool,
        requirement: Requirement,
        on_denied: DeniedTarget,
    ) -> Self {
        Self {
            name,
            awaits_hydration,
            requirement,
            on_denied,
        }
    }

    /// Requires authentication, trusts the pre-hydration default.
    ///
    /// On a reload this can redirect to login one tick before hydration
    /// would have proven a durable session; use [`GuardPolicy::enhanced`]
    /// where that matters.
    pub fn basic(routes: &RoutesConfig) -> Self {
        Self::new(
            "basic",
            false,
            Requirement::Authenticated,
            DeniedTarget::LoginReturningHere {
                login: routes.login.clone(),
            },
        )
    }

    /// Requires authentication and waits for hydration before deciding.
    pub fn enhanced(routes: &RoutesConfig) -> Self {
        Self::new(
            "enhanced",
            true,
            Requirement::Authenticated,
            DeniedTarget::LoginReturningHere {
                login: routes.login.clone(),
            },
        )
    }

    pub fn admin(routes: &RoutesConfig) -> Self {
        Self::new(
            "admin",
            true,
            Requirement::Capability(Capability::AdminPanel),
            DeniedTarget::LoginOrForbidden {
                login: routes.login.clone(),
                return_to: routes.admin.clone(),
                forbidden: routes.forbidden.clone(),
            },
        )
    }

    /// Only for anonymous visitors; authenticated ones go to `redirect_to`
    /// (home when `None`).
    pub fn public_only(routes: &RoutesConfig, redirect_to: Option<&str>) -> Self {
        let target = redirect_to.unwrap_or(routes.home.as_str()).to_string();
        Self::new(
            "public_only",
            false,
            Requirement::Anonymous,
            DeniedTarget::Fixed(target),
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn evaluate(&self, session: &Session, current_path: &str) -> Verdict {
        if session.is_loading || (self.awaits_hydration && !session.is_hydrated()) {
            return Verdict::Pending;
        }

        let allowed = match self.requirement {
            Requirement::Authenticated => session.is_authenticated(),
            Requirement::Capability(capability) => {
                session.is_authenticated()
                    && capability::resolve(session.user.as_ref()).contains(capability)
            }
            Requirement::Anonymous => !session.is_authenticated(),
        };

        if allowed {
            Verdict::Allowed
        } else {
            Verdict::Denied {
                target: self.denied_target(session, current_path),
            }
        }
    }

    fn denied_target(&self, session: &Session, current_path: &str) -> String {
        match &self.on_denied {
            DeniedTarget::LoginReturningHere { login } => login_redirect(login, current_path),
            DeniedTarget::LoginOrForbidden {
                login,
                return_to,
                forbidden,
            } => {
                if session.is_authenticated() {
                    forbidden.clone()
                } else {
                    login_redirect(login, return_to)
                }
            }
            DeniedTarget::Fixed(target) => target.clone(),
        }
    }
}
