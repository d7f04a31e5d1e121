//! Key-value persistence for the durable session snapshot.
//!
//! Values are opaque strings (the store writes JSON). Backends report
//! failures, but the session store treats any failure as "no durable state".

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Persistence capability used by the session store.
pub trait SessionStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug)]
pub enum StorageError {
    /// Backend cannot be reached at all (poisoned lock, missing directory).
    Unavailable(String),
    /// Key contains characters the backend cannot store.
    InvalidKey(String),
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            StorageError::InvalidKey(key) => write!(f, "invalid storage key: {key}"),
            StorageError::Io(e) => write!(f, "storage io error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// In-process storage. Clones share the same map, so a second store built
/// from a clone sees what the first one wrote (a simulated reload).
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key (`<dir>/<key>.json`).
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SessionStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Readers must never observe a partially written snapshot.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "lapak-storage-{}-{}-{}",
            name,
            std::process::id(),
            uuid::Uuid::new_v4()
        ))
    }

    #[test]
    fn test_memory_storage_clones_share_entries() {
        let storage = MemoryStorage::new();
        let reloaded = storage.clone();

        assert_eq!(reloaded.load("auth-storage").unwrap(), None);
        storage.save("auth-storage", "{}").unwrap();
        assert_eq!(reloaded.load("auth-storage").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_storage_roundtrip_and_missing_key() {
        let dir = temp_dir("roundtrip");
        let storage = FileStorage::open(&dir).unwrap();

        assert_eq!(storage.load("auth-storage").unwrap(), None);

        storage.save("auth-storage", r#"{"state":{}}"#).unwrap();
        assert_eq!(
            storage.load("auth-storage").unwrap().as_deref(),
            Some(r#"{"state":{}}"#)
        );
        assert!(dir.join("auth-storage.json").exists());
        assert!(!dir.join("auth-storage.json.tmp").exists());

        storage.save("auth-storage", "{}").unwrap();
        let reopened = FileStorage::open(&dir).unwrap();
        assert_eq!(reopened.load("auth-storage").unwrap().as_deref(), Some("{}"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_storage_rejects_path_like_keys() {
        let dir = temp_dir("keys");
        let storage = FileStorage::open(&dir).unwrap();

        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(
                matches!(storage.save(key, "x"), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
