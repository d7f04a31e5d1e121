//! Access control: route guards for whole pages and a gate for single actions.
//!
//! All four route guards share [`GuardPolicy::evaluate`]; they differ only in
//! requirement, hydration awareness and redirect target:
//!
//! | Guard | Allowed when | Denied target | Pending while |
//! |---|---|---|---|
//! | basic | authenticated | `/login?redirect=<path>` | loading |
//! | enhanced | authenticated | `/login?redirect=<path>` | cold or loading |
//! | admin | `AdminPanel` capability | `/login?redirect=/admin` or `/forbidden` | cold or loading |
//! | public-only | anonymous | configurable, `/` by default | loading |

mod action;
mod policy;
mod route;

pub use action::{AuthGate, LOGIN_REQUIRED_MESSAGE};
pub use policy::{DeniedTarget, GuardPolicy, Placeholder, Render, Requirement, Verdict};
pub use route::{GuardState, RouteGuard};
