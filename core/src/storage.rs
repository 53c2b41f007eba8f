//! Access-token persistence.
//!
//! # Design
//! A requester owns exactly one `TokenStore`, chosen when it is built:
//! `LocalStorage` (a small JSON key/value file, the desktop analogue of a
//! browser's local storage) when no host context is given, or
//! `ContextStorage` delegating to the host's `UniversalStorage` otherwise.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ApiError;

/// Key the access token is stored under.
pub const TOKEN_KEY: &str = "t";

pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;
}

/// Storage capability provided by a host application.
pub trait UniversalStorage: Send + Sync {
    fn get_universal(&self, key: &str) -> Option<String>;
    fn set_universal(&self, key: &str, value: &str);
}

/// Host context handed to `create_api_requester`.
#[derive(Clone)]
pub struct Context {
    pub storage: Arc<dyn UniversalStorage>,
}

impl Context {
    pub fn new(storage: Arc<dyn UniversalStorage>) -> Self {
        Self { storage }
    }
}

/// `TokenStore` backed by a host context's universal storage.
pub struct ContextStorage {
    ctx: Context,
}

impl ContextStorage {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl TokenStore for ContextStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.ctx.storage.get_universal(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.ctx.storage.set_universal(key, value);
        Ok(())
    }
}

/// In-memory `UniversalStorage`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UniversalStorage for MemoryStorage {
    fn get_universal(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_universal(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

/// File-backed persistent key/value store.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<data dir>/slimapi/local_storage.json` for the current platform.
    pub fn default_path() -> Result<PathBuf, ApiError> {
        let base = dirs::data_local_dir()
            .ok_or_else(|| ApiError::Config("no local data directory for this platform".to_string()))?;
        Ok(base.join("slimapi").join("local_storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ApiError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| ApiError::StorageFormat(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl TokenStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&values)
            .map_err(|e| ApiError::StorageFormat(e.to_string()))?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_storage_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStorage::new(dir.path().join("nope.json"));
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn local_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        LocalStorage::new(&path).set(TOKEN_KEY, "abc").unwrap();
        let reopened = LocalStorage::new(&path);
        assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn local_storage_overwrites_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStorage::new(dir.path().join("store.json"));
        store.set("other", "1").unwrap();
        store.set(TOKEN_KEY, "first").unwrap();
        store.set(TOKEN_KEY, "second").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("second"));
        assert_eq!(store.get("other").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn local_storage_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();
        let err = LocalStorage::new(&path).get(TOKEN_KEY).unwrap_err();
        assert!(matches!(err, ApiError::StorageFormat(_)));
    }

    #[test]
    fn context_storage_delegates_to_host() {
        let host = Arc::new(MemoryStorage::new());
        let store = ContextStorage::new(Context::new(host.clone()));
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        store.set(TOKEN_KEY, "tok").unwrap();
        assert_eq!(host.get_universal(TOKEN_KEY).as_deref(), Some("tok"));
    }
}
