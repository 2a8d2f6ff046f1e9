//! Key-value persistence
//!
//! Standings and settings are stored as JSON blobs under fixed keys. On the web
//! the store is LocalStorage; natively (and in tests) it is an in-memory map.
//! Loading never fails: absent or corrupted blobs fall back to defaults.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

#[cfg(target_arch = "wasm32")]
mod local;

#[cfg(target_arch = "wasm32")]
pub use local::LocalStore;

/// Persistence failures (only ever logged, never surfaced to the race)
#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("storage unavailable")]
    Unavailable,

    #[error("malformed data under {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {key}: {reason}")]
    Write { key: String, reason: String },
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Minimal string key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> PersistResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> PersistResult<()>;
    fn remove(&mut self, key: &str) -> PersistResult<()>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PersistResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> PersistResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PersistResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Read and decode a JSON value; `Ok(None)` if the key is absent
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> PersistResult<Option<T>> {
    let Some(json) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|source| PersistError::Malformed {
            key: key.to_string(),
            source,
        })
}

/// Encode and write a JSON value
pub fn save_json<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> PersistResult<()> {
    let json = serde_json::to_string(value).map_err(|e| PersistError::Write {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, &json)
}

/// Load a value, substituting the default on absence or any failure
pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match load_json(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => {
            log::info!("No saved {key}, starting fresh");
            T::default()
        }
        Err(e) => {
            log::warn!("{e}; using defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        count: u32,
    }

    #[test]
    fn test_round_trip_through_memory_store() {
        let mut store = MemoryStore::new();
        save_json(&mut store, "sample", &Sample { count: 3 }).unwrap();
        let loaded: Option<Sample> = load_json(&store, "sample").unwrap();
        assert_eq!(loaded, Some(Sample { count: 3 }));
    }

    #[test]
    fn test_absent_and_corrupt_fall_back() {
        let mut store = MemoryStore::new();
        let absent: Sample = load_or_default(&store, "sample");
        assert_eq!(absent, Sample::default());

        store.set("sample", "{ \"count\": \"many\" ").unwrap();
        assert!(matches!(
            load_json::<Sample>(&store, "sample"),
            Err(PersistError::Malformed { .. })
        ));
        let corrupt: Sample = load_or_default(&store, "sample");
        assert_eq!(corrupt, Sample::default());
    }

    #[test]
    fn test_remove() {
        let mut store = MemoryStore::new();
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(PersistError::Unavailable.to_string(), "storage unavailable");
        let err = PersistError::Write {
            key: "k".into(),
            reason: "quota".into(),
        };
        assert!(err.to_string().contains("quota"));
    }
}
