//! Score persistence port
//!
//! Leaderboards and settings are read and written through a `ScoreStore`
//! handed to the cabinet at construction. Every failure is reported as a
//! `PersistenceError`; callers log it and carry on without durability.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;
#[cfg(target_arch = "wasm32")]
pub use web::LocalStorageStore;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("store rejected key {key:?}")]
    Rejected { key: String },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Key/value backing store for leaderboards and settings
pub trait ScoreStore {
    /// Raw stored text under `key`, `None` if nothing was saved yet
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&mut self, key: &str, data: &str) -> Result<()>;
}

/// Keys are short identifiers; anything else is refused by every backend
pub(crate) fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.len() <= 64
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::Rejected { key: key.to_string() })
    }
}

/// In-memory store; clones share the same contents
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, data: &str) {
        self.data.borrow_mut().insert(key.to_string(), data.to_string());
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }
}

impl ScoreStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, data: &str) -> Result<()> {
        check_key(key)?;
        self.insert(key, data);
        Ok(())
    }
}

/// Store that fails on write (and optionally on read)
#[derive(Debug, Clone, Default)]
pub struct FailingStore {
    pub fail_reads: bool,
    pub inner: MemoryStore,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads succeed from `inner`, every write fails
    pub fn read_only(inner: MemoryStore) -> Self {
        Self {
            fail_reads: false,
            inner,
        }
    }
}

impl ScoreStore for FailingStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads {
            return Err(PersistenceError::Unavailable("store offline".into()));
        }
        self.inner.load(key)
    }

    fn save(&mut self, _key: &str, _data: &str) -> Result<()> {
        Err(PersistenceError::Unavailable("quota exceeded".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip_shares_clones() {
        let store = MemoryStore::new();
        let mut handle = store.clone();
        assert!(handle.save("maze_scores", "[]").is_ok());
        assert_eq!(store.get("maze_scores").as_deref(), Some("[]"));
        assert!(matches!(store.load("missing"), Ok(None)));
    }

    #[test]
    fn test_bad_keys_rejected() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.save("../etc", "x"),
            Err(PersistenceError::Rejected { .. })
        ));
        assert!(store.load("").is_err());
    }

    #[test]
    fn test_failing_store() {
        let mut store = FailingStore::new();
        assert!(store.save("k", "v").is_err());
        store.fail_reads = true;
        assert!(matches!(store.load("k"), Err(PersistenceError::Unavailable(_))));
    }
}
