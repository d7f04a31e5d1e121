//! External identity service: resolves a bearer credential to the user it
//! belongs to ("who am I").
//!
//! Two adapters ship with the crate: [`HttpIdentityService`] for a hosted
//! auth backend and [`TokenIdentityService`] for self-contained signed
//! tokens (development and offline use).

mod http;
mod token;

use std::fmt;
use std::future::Future;

use crate::session::User;

pub use http::{DEFAULT_USER_PATH, HttpIdentityConfig, HttpIdentityService};
pub use token::{TOKEN_DURATION_SECS, TokenClaims, TokenError, TokenIdentityService};
pub(crate) use token::unix_now;

/// "Who am I" capability used by the restore sequence.
pub trait IdentityService: Send + Sync {
    fn current_user(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<User, IdentityError>> + Send;
}

#[derive(Debug)]
pub enum IdentityError {
    /// Credential rejected (invalid, expired, revoked).
    Unauthorized,
    /// Service unreachable or answered with an unexpected status.
    Transport(String),
    /// Service answered, but the payload was not a user record.
    InvalidResponse(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Unauthorized => write!(f, "credential rejected"),
            IdentityError::Transport(msg) => write!(f, "identity service unavailable: {msg}"),
            IdentityError::InvalidResponse(msg) => {
                write!(f, "invalid identity service response: {msg}")
            }
        }
    }
}

impl std::error::Error for IdentityError {}
