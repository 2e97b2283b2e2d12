use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use parking_lot::Mutex;

use crate::config::StorageConfig;

pub trait Storage: Send + Sync {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

// All entries live in a single JSON object in one file.
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles on the backing file.
    file_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_lock: Mutex::new(()),
        }
    }

    fn read_entries(path: &Path) -> anyhow::Result<HashMap<String, String>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(path).context("Failed to read store file")?;
        serde_json::from_str(&contents).context("Store file is not a valid JSON object")
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let _guard = self.file_lock.lock();
        let entries = Self::read_entries(&self.path)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let _guard = self.file_lock.lock();
        // A corrupt file is replaced with a fresh map.
        let mut entries = Self::read_entries(&self.path).unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        let contents =
            serde_json::to_string_pretty(&entries).context("Failed to serialize store entries")?;
        fs::write(&self.path, contents).context("Failed to write store file")?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub fn from_config(config: &StorageConfig) -> Arc<dyn Storage> {
    if config.persist {
        Arc::new(FileStorage::new(&config.path))
    } else {
        log::debug!("Speed persistence is disabled; using in-memory storage");
        Arc::new(MemoryStorage::new())
    }
}
