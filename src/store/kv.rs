use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::CliError;

pub const SELECTION_KEY: &str = "selectedProducts";
pub const CONVERSATION_KEY: &str = "chatHistory";

/// Flat string key-value storage; the terminal equivalent of browser local storage.
pub trait KeyValueStore: std::fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>, CliError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CliError>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CliError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_error("read", &path, err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CliError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|e| storage_error("create", &self.dir, e))?;
        fs::write(&path, value).map_err(|e| storage_error("write", &path, e))
    }
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> CliError {
    CliError::Storage(format!("Failed to {action} {}: {err}", path.display()))
}

/// In-process storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CliError> {
        self.entries
            .lock()
            .map_err(|_| CliError::Storage("Storage lock poisoned.".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CliError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CliError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Memory storage whose writes can be switched off, like a disk that fills up mid-session.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    reject_writes: Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl FlakyStore {
    pub(crate) fn reject_writes(&self, reject: bool) {
        self.reject_writes
            .store(reject, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, CliError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CliError> {
        if self.reject_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CliError::Storage(format!("Failed to write {key}: disk full")));
        }
        self.inner.set(key, value)
    }
}

/// Read a JSON value; absence, read failure and parse failure all yield `None`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let text = match store.get(key) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(err) => {
            tracing::debug!(key, error = %err, "storage read failed");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(key, error = %err, "discarding unparsable stored value");
            None
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), CliError> {
    store.set(key, &serde_json::to_string(value)?)
}
