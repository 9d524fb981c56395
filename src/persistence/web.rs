//! Browser LocalStorage store

use super::{PersistenceError, Result, ScoreStore, check_key};

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Result<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| PersistenceError::Unavailable("localStorage not available".into()))
    }
}

impl ScoreStore for LocalStorageStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        Self::storage()?
            .get_item(key)
            .map_err(|e| PersistenceError::Unavailable(format!("{e:?}")))
    }

    fn save(&mut self, key: &str, data: &str) -> Result<()> {
        check_key(key)?;
        Self::storage()?
            .set_item(key, data)
            .map_err(|_| PersistenceError::Rejected { key: key.to_string() })
    }
}
