#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lapak::SessionContext;
use lapak::config::{RoutesConfig, StoreConfig};
use lapak::identity::{IdentityError, IdentityService};
use lapak::navigation::MemoryNavigator;
use lapak::session::{Role, User};
use lapak::storage::{MemoryStorage, SessionStorage, StorageError};
use tokio::sync::Notify;

pub const STORAGE_KEY: &str = "auth-storage";

pub fn customer() -> User {
    let mut user = User::new("u-100", "rina@example.com", Role::Customer, "1700000000");
    user.full_name = Some("Rina".to_string());
    user
}

pub fn admin() -> User {
    User::new("u-1", "admin@example.com", Role::Admin, "1690000000")
}

/// App shell pieces for one simulated process.
pub struct TestApp {
    pub ctx: SessionContext,
    pub storage: MemoryStorage,
    pub navigator: Arc<MemoryNavigator>,
}

impl TestApp {
    /// Fresh process over `storage`. Pass a clone of an earlier app's
    /// storage to simulate a reload.
    pub fn start(storage: MemoryStorage, path: &str) -> Self {
        let navigator = Arc::new(MemoryNavigator::new(path));
        let ctx = SessionContext::new(
            Arc::new(storage.clone()),
            navigator.clone(),
            StoreConfig::default(),
            RoutesConfig::default(),
        );
        Self {
            ctx,
            storage,
            navigator,
        }
    }

    pub fn fresh(path: &str) -> Self {
        Self::start(MemoryStorage::new(), path)
    }
}

/// Storage holding a logged-in snapshot for `user`.
pub fn storage_with_session(user: &User, credential: &str) -> MemoryStorage {
    let storage = MemoryStorage::new();
    let app = TestApp::start(storage.clone(), "/");
    app.ctx.store.login(user.clone(), credential);
    storage
}

#[derive(Clone)]
pub enum Answer {
    User(User),
    Unauthorized,
    Down,
}

impl Answer {
    fn resolve(&self) -> Result<User, IdentityError> {
        match self {
            Answer::User(user) => Ok(user.clone()),
            Answer::Unauthorized => Err(IdentityError::Unauthorized),
            Answer::Down => Err(IdentityError::Transport("connection refused".to_string())),
        }
    }
}

/// Identity service answering immediately.
pub struct StubIdentity {
    answer: Answer,
    calls: AtomicUsize,
}

impl StubIdentity {
    pub fn new(answer: Answer) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentityService for StubIdentity {
    async fn current_user(&self, _credential: &str) -> Result<User, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.resolve()
    }
}

/// Identity service that answers only after `release()`.
pub struct GatedIdentity {
    answer: Answer,
    gate: Arc<Notify>,
}

impl GatedIdentity {
    pub fn new(answer: Answer) -> Self {
        Self {
            answer,
            gate: Arc::new(Notify::new()),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

impl IdentityService for GatedIdentity {
    async fn current_user(&self, _credential: &str) -> Result<User, IdentityError> {
        self.gate.notified().await;
        self.answer.resolve()
    }
}

/// Storage whose every operation fails.
pub struct BrokenStorage;

impl SessionStorage for BrokenStorage {
    fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("quota exceeded".to_string()))
    }

    fn save(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("quota exceeded".to_string()))
    }
}

/// Memory storage whose writes can be switched to fail mid-test.
#[derive(Clone, Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    failing: Arc<AtomicBool>,
}

impl FlakyStorage {
    pub fn wrap(inner: MemoryStorage) -> Self {
        Self {
            inner,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl SessionStorage for FlakyStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        self.inner.save(key, value)
    }
}
