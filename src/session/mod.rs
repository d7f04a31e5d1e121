//! Client session: identity record, durable snapshot and the store that owns them.
//!
//! The store starts `Cold` on every process start. Nothing read from storage
//! is trusted until [`SessionStore::rehydrate`] has run, which moves the
//! hydration phase to `Hydrated` for the rest of the process lifetime.

mod state;
mod store;
mod user;

pub use state::{DurableSnapshot, HydrationPhase, PersistedEnvelope, SNAPSHOT_VERSION, Session};
pub use store::SessionStore;
pub use user::{Role, User, UserPatch};
