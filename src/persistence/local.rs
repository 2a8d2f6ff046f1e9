//! LocalStorage-backed store (wasm only)

use super::{KeyValueStore, PersistError, PersistResult};

/// Browser LocalStorage
pub struct LocalStore {
    storage: web_sys::Storage,
}

impl LocalStore {
    /// Open the window's LocalStorage, if the browser allows it
    pub fn open() -> PersistResult<Self> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .map(|storage| Self { storage })
            .ok_or(PersistError::Unavailable)
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> PersistResult<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|_| PersistError::Unavailable)
    }

    fn set(&mut self, key: &str, value: &str) -> PersistResult<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| PersistError::Write {
                key: key.to_string(),
                reason: format!("{e:?}"),
            })
    }

    fn remove(&mut self, key: &str) -> PersistResult<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| PersistError::Write {
                key: key.to_string(),
                reason: format!("{e:?}"),
            })
    }
}
