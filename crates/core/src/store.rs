//! Durable key-value storage backing the repository.

use std::{
    collections::HashMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result as AnyResult};
use parking_lot::RwLock;
use tracing::warn;

use crate::error::{LifecycleError, Result};

/// String-keyed store that survives restarts.
pub trait KeyValueStore {
    /// Read the value under `key`, `None` when it was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove `key`; absent keys are ignored.
    fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the key files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }

    fn read(&self, key: &str) -> AnyResult<Option<String>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        match String::from_utf8(bytes) {
            Ok(content) => Ok(Some(content)),
            Err(err) => {
                warn!(path = %path.display(), "Ignoring store file that is not UTF-8: {err}");
                Ok(None)
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> AnyResult<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.path_for(key);
        let mut staged = tempfile::NamedTempFile::new_in(&self.root)
            .with_context(|| format!("failed to stage write in {}", self.root.display()))?;
        staged
            .write_all(value.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        staged
            .persist(&path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> AnyResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key).map_err(LifecycleError::persistence)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value).map_err(LifecycleError::persistence)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.delete(key).map_err(LifecycleError::persistence)
    }
}

/// Process-local store, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

fn sanitize_key(key: &str) -> String {
    let mut result = String::with_capacity(key.len());
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            result.push(ch);
        } else {
            result.push('_');
        }
    }
    if result.is_empty() {
        "store".to_string()
    } else {
        result
    }
}
