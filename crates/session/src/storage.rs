//! Persistent key-value storage
//!
//! The session only remembers one thing across restarts: the last stake per
//! currency, under `saved_amount:{currency}`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::types::Money;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub fn amount_key(currency: &str) -> String {
    format!("saved_amount:{currency}")
}

/// Saved stake for `currency`, when present and numeric.
pub fn saved_amount(store: &dyn KeyValueStore, currency: &str) -> Option<Money> {
    store.get(&amount_key(currency))?.parse().ok()
}

pub fn save_amount(store: &dyn KeyValueStore, currency: &str, amount: Money) -> Result<(), StoreError> {
    store.set(&amount_key(currency), &amount.to_string())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("mines-store-{}", uuid::Uuid::new_v4()))
            .join("store.json")
    }

    #[test]
    fn memory_store_round_trips_amounts() {
        let store = MemoryStore::new();
        assert_eq!(saved_amount(&store, "EUR"), None);
        save_amount(&store, "EUR", Money::from_cents(250)).unwrap();
        assert_eq!(store.get("saved_amount:EUR").as_deref(), Some("2.50"));
        assert_eq!(saved_amount(&store, "EUR"), Some(Money::from_cents(250)));
        assert_eq!(saved_amount(&store, "USD"), None);
    }

    #[test]
    fn non_numeric_saved_amount_is_ignored() {
        let store = MemoryStore::new();
        store.set(&amount_key("USD"), "abc").unwrap();
        assert_eq!(saved_amount(&store, "USD"), None);
    }

    #[test]
    fn json_file_store_persists_across_opens() {
        let path = temp_path();
        {
            let store = JsonFileStore::open(&path).unwrap();
            assert_eq!(store.get("k"), None);
            store.set("k", "v").unwrap();
        }
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").as_deref(), Some("v"));
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn json_file_store_rejects_corrupt_file() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Json(_))));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
