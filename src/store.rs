use std::{collections::HashMap, fs, path::PathBuf};

use parking_lot::RwLock;

use crate::error::ClassifierError;

/// Key-value persistence for model artifacts. Entries have no TTL and are
/// never evicted; failures are recoverable and callers fall back to a remote
/// fetch instead of treating them as fatal.
pub trait ArtifactStore: Send + Sync {
    fn exists(&self, key: &str) -> bool;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ClassifierError>;
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ClassifierError>;
    fn remove(&self, key: &str) -> Result<(), ClassifierError>;
}

/// Directory-backed store: one file per key under a namespace root.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ArtifactStore for FsStore {
    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ClassifierError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .map_err(|e| ClassifierError::Storage(format!("read {}: {e}", path.display())))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ClassifierError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| ClassifierError::Storage(format!("create {}: {e}", self.root.display())))?;
        let path = self.path_for(key);
        fs::write(&path, bytes)
            .map_err(|e| ClassifierError::Storage(format!("write {}: {e}", path.display())))
    }

    fn remove(&self, key: &str) -> Result<(), ClassifierError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(());
        }
        fs::remove_file(&path)
            .map_err(|e| ClassifierError::Storage(format!("remove {}: {e}", path.display())))
    }
}

/// In-memory store, used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ArtifactStore for MemoryStore {
    fn exists(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ClassifierError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ClassifierError> {
        self.entries.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClassifierError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
