//! Session state and its durable subset.

use serde::{Deserialize, Serialize};

use super::user::User;

/// Version written into the persisted envelope.
pub const SNAPSHOT_VERSION: u32 = 0;

/// Whether the durable snapshot has been loaded into memory yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HydrationPhase {
    /// Process just started, storage not read.
    #[default]
    Cold,
    /// A storage read is in progress.
    Hydrating,
    /// The snapshot (or its absence) has been applied at least once.
    Hydrated,
}

/// The authoritative record of who is using the app right now.
///
/// `is_authenticated` is derived from `user` so it cannot drift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub credential: Option<String>,
    pub is_loading: bool,
    pub phase: HydrationPhase,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_hydrated(&self) -> bool {
        self.phase == HydrationPhase::Hydrated
    }

    /// The subset that survives a reload.
    pub fn durable(&self) -> DurableSnapshot {
        DurableSnapshot {
            user: self.user.clone(),
            credential: self.credential.clone(),
            is_authenticated: self.is_authenticated(),
        }
    }
}

/// Persisted fields. `is_authenticated` is written for readers of the raw
/// storage value but ignored on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableSnapshot {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default, rename = "token")]
    pub credential: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

/// Storage wrapper: `{"state": {...}, "version": 0}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEnvelope {
    pub state: DurableSnapshot,
    #[serde(default)]
    pub version: u32,
}

impl PersistedEnvelope {
    pub fn new(state: DurableSnapshot) -> Self {
        Self {
            state,
            version: SNAPSHOT_VERSION,
        }
    }
}
