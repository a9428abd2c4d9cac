//! Record store implementations
//!
//! [`FileRecordStore`] keeps each named record as `<dir>/<name>.json` and
//! replaces it atomically (write to a temporary file, then rename).
//! [`MemoryRecordStore`] keeps records in memory for hosts without a
//! writable data directory and for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use crashlens_core::ports::RecordStore;
use parking_lot::Mutex;

use crate::error::PersistenceError;

/// Stores named records as files in one directory.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the default store directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("crashlens")
    }

    /// Path of the file backing `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        match std::fs::read(self.path_for(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, contents: &[u8]) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        let tmp = self.dir.join(format!(".{name}.json.tmp"));
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl RecordStore for FileRecordStore {
    fn get(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.read(name)
            .with_context(|| format!("reading {}", self.path_for(name).display()))
    }

    fn set(&self, name: &str, contents: &[u8]) -> anyhow::Result<()> {
        self.write(name, contents)
            .with_context(|| format!("writing {}", self.path_for(name).display()))
    }
}

/// Keeps named records in memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.records.lock().get(name).cloned())
    }

    fn set(&self, name: &str, contents: &[u8]) -> anyhow::Result<()> {
        self.records
            .lock()
            .insert(name.to_string(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());
        assert!(store.get("session").unwrap().is_none());
    }

    #[test]
    fn test_file_store_round_trip_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path().join("nested"));
        store.set("session", b"{\"a\":1}").unwrap();
        assert!(store.path_for("session").exists());
        assert_eq!(store.get("session").unwrap().unwrap(), b"{\"a\":1}");

        store.set("session", b"{}").unwrap();
        assert_eq!(store.get("session").unwrap().unwrap(), b"{}");
        assert!(!dir.path().join("nested/.session.json.tmp").exists());
    }

    #[test]
    fn test_file_store_unwritable_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let store = FileRecordStore::new(blocker.join("sub"));
        assert!(store.set("session", b"{}").is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryRecordStore::new();
        assert!(store.get("a").unwrap().is_none());
        store.set("a", b"1").unwrap();
        store.set("b", b"2").unwrap();
        assert_eq!(store.get("a").unwrap().unwrap(), b"1");
        assert_eq!(store.get("b").unwrap().unwrap(), b"2");
    }

    #[test]
    fn test_default_dir_names_crate() {
        assert!(FileRecordStore::default_dir().ends_with("crashlens"));
    }
}
