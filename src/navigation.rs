//! Navigation capability and redirect target helpers.

use std::sync::Mutex;

use tracing::debug;
use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// New history entry.
    Push,
    /// Replace the current entry; back does not return to the guarded page.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub target: String,
    pub mode: NavigationMode,
}

impl Navigation {
    pub fn push(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            mode: NavigationMode::Push,
        }
    }

    pub fn replace(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            mode: NavigationMode::Replace,
        }
    }
}

/// Router side of the app shell.
pub trait Navigator: Send + Sync {
    fn navigate(&self, navigation: Navigation);
    fn current_path(&self) -> String;
}

/// `<login>?redirect=<return_to>` with the return path URL-encoded.
pub fn login_redirect(login_path: &str, return_to: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(return_to.as_bytes()).collect();
    format!("{login_path}?redirect={encoded}")
}

/// History-stack navigator kept entirely in memory.
#[derive(Debug)]
pub struct MemoryNavigator {
    inner: Mutex<History>,
}

#[derive(Debug)]
struct History {
    entries: Vec<String>,
    log: Vec<Navigation>,
}

impl MemoryNavigator {
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(History {
                entries: vec![initial_path.into()],
                log: Vec::new(),
            }),
        }
    }

    /// Every navigation issued so far, oldest first.
    pub fn navigations(&self) -> Vec<Navigation> {
        self.inner
            .lock()
            .map(|h| h.log.clone())
            .unwrap_or_default()
    }

    /// Current history stack, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|h| h.entries.clone())
            .unwrap_or_default()
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&self, navigation: Navigation) {
        let Ok(mut history) = self.inner.lock() else {
            return;
        };
        match navigation.mode {
            NavigationMode::Push => history.entries.push(navigation.target.clone()),
            NavigationMode::Replace => {
                history.entries.pop();
                history.entries.push(navigation.target.clone());
            }
        }
        debug!(path = %navigation.target, mode = ?navigation.mode, "Navigate");
        history.log.push(navigation);
    }

    fn current_path(&self) -> String {
        self.inner
            .lock()
            .ok()
            .and_then(|h| h.entries.last().cloned())
            .unwrap_or_else(|| "/".to_string())
    }
}
