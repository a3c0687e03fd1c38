use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value persistence. Values are opaque to the storage.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key under the data directory.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self, StorageError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StorageError::Unavailable("no user data directory".to_string()))?;
        Self::with_base_dir(data_dir.join("glyphdr"))
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for JsonStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.file_path(key);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                None
            }
        }
    }

    /// Write to a temp file and rename over the target so a crash mid-write
    /// never leaves a truncated file behind.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

/// In-memory storage. Clones share the same map, so a caller can keep a
/// handle after moving a clone into a `ScoreStore`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_get_missing_key() {
        let (_dir, store) = make_test_store();
        assert_eq!(store.get("scores"), None);
    }

    #[test]
    fn test_set_then_get() {
        let (_dir, mut store) = make_test_store();
        store.set("scores", r#"{"a":1}"#).unwrap();
        assert_eq!(store.get("scores").as_deref(), Some(r#"{"a":1}"#));
        assert!(store.file_path("scores").exists());
    }

    #[test]
    fn test_set_leaves_no_tmp_file() {
        let (dir, mut store) = make_test_store();
        store.set("scores", "{}").unwrap();
        store.set("scores", "{}").unwrap();
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }

    #[test]
    fn test_set_into_removed_dir_fails() {
        let (dir, mut store) = make_test_store();
        store.base_dir = dir.path().join("gone");
        assert!(store.set("scores", "{}").is_err());
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let handle = MemoryStore::new();
        let mut moved = handle.clone();
        moved.set("k", "v").unwrap();
        assert_eq!(handle.get("k").as_deref(), Some("v"));
    }
}
