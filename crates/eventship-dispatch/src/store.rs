//! File-based and in-memory durable stores.
//! Each key is one JSON file. Files stay human-readable after a crash.
//! Writes go to a temp file first and are renamed into place.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use eventship_core::config::{StoreBackend, StoreConfig};
use eventship_core::error::{Result, ShipError};
use eventship_core::traits::DurableStore;

use crate::persistence::SqliteStore;

/// Open the configured backend.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn DurableStore>> {
    let store: Arc<dyn DurableStore> = match config.backend {
        StoreBackend::File => {
            let store = FileStore::new(&config.resolved_path())?;
            tracing::debug!("💾 File store at {}", store.dir().display());
            Arc::new(store)
        }
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.resolved_path())?),
        StoreBackend::Memory => {
            tracing::warn!("⚠️ Memory store selected: events will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

/// Keys become file names, so only a conservative alphabet is accepted.
fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ShipError::Store(format!("Invalid store key: '{key}'")))
    }
}

/// File-based store: `<dir>/<key>.json`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> Result<PathBuf> {
        check_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl DurableStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        let file = self.file_for(key)?;
        match std::fs::read_to_string(&file) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShipError::Store(format!(
                "Failed to read {}: {e}",
                file.display()
            ))),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let file = self.file_for(key)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        {
            let mut f = std::fs::File::create(&tmp)?;
            f.write_all(value.as_bytes())?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp, &file)?;
        sync_dir(&self.dir)?;
        tracing::debug!("💾 Saved '{}' ({} bytes) to {}", key, value.len(), file.display());
        Ok(())
    }
}

/// Flush the directory entry so the rename itself survives a power loss.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// In-memory store. Clones share the same map, so a clone handed to a second
/// dispatcher sees everything the first one saved, like a process restart
/// over the same disk.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value under `key`, for assertions.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl DurableStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| ShipError::Store(format!("Memory store poisoned: {e}")))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| ShipError::Store(format!("Memory store poisoned: {e}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = std::env::temp_dir().join("eventship-test-file-store");
        std::fs::remove_dir_all(&dir).ok();
        let store = FileStore::new(&dir).unwrap();
        assert_eq!(store.dir(), dir.as_path());
        assert_eq!(store.load("pending_events").unwrap(), None);

        store.save("pending_events", r#"{"events":[]}"#).unwrap();
        assert_eq!(
            store.load("pending_events").unwrap().as_deref(),
            Some(r#"{"events":[]}"#)
        );

        // Survives reopening the same directory
        let reopened = FileStore::new(&dir).unwrap();
        assert!(reopened.load("pending_events").unwrap().is_some());
        assert!(!dir.join(".pending_events.json.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_store_overwrites() {
        let dir = std::env::temp_dir().join("eventship-test-file-overwrite");
        std::fs::remove_dir_all(&dir).ok();
        let store = FileStore::new(&dir).unwrap();
        store.save("k", "first").unwrap();
        store.save("k", "second").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("second"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rejects_path_keys() {
        let dir = std::env::temp_dir().join("eventship-test-file-keys");
        let store = FileStore::new(&dir).unwrap();
        assert!(store.save("../escape", "x").is_err());
        assert!(store.save("a/b", "x").is_err());
        assert!(store.load("").is_err());
        assert!(store.load("..").is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_open_store_backends() {
        let dir = std::env::temp_dir().join("eventship-test-open-store");
        std::fs::remove_dir_all(&dir).ok();

        let mut config = StoreConfig {
            path: Some(dir.join("files").display().to_string()),
            ..StoreConfig::default()
        };
        assert_eq!(open_store(&config).unwrap().name(), "file");

        config.backend = StoreBackend::Sqlite;
        config.path = Some(dir.join("state.db").display().to_string());
        let store = open_store(&config).unwrap();
        assert_eq!(store.name(), "sqlite");
        store.save("k", "v").unwrap();
        assert!(dir.join("state.db").exists());

        config.backend = StoreBackend::Memory;
        assert_eq!(open_store(&config).unwrap().name(), "memory");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.save("k", "v").unwrap();
        assert_eq!(other.load("k").unwrap().as_deref(), Some("v"));
        assert_eq!(other.get("missing"), None);
    }
}
