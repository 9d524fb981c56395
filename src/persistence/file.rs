//! Directory-backed store for the native runner (one JSON file per key)

use std::fs;
use std::path::{Path, PathBuf};

use super::{Result, ScoreStore, check_key};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Use `root` as the store directory, creating it if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl ScoreStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, key: &str, data: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Write then rename so a crash never leaves a half-written file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::PersistenceError;

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore::open(dir.path().join("scores")).expect("open");
        assert!(matches!(store.load("rocks_scores"), Ok(None)));
        store.save("rocks_scores", "[{\"x\":1}]").expect("save");
        assert_eq!(
            store.load("rocks_scores").expect("load").as_deref(),
            Some("[{\"x\":1}]")
        );
        assert!(!dir.path().join("scores/rocks_scores.json.tmp").exists());
    }

    #[test]
    fn test_file_rejects_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore::open(dir.path()).expect("open");
        assert!(matches!(
            store.save("../x", "{}"),
            Err(PersistenceError::Rejected { .. })
        ));
    }
}
