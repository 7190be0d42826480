//! Flat string key-value storage.
//!
//! This is the raw persistence primitive: opaque get/set/remove of string
//! blobs. `FileStore` keeps one file per key with atomic replacement;
//! `MemoryStore` is for tests and throwaway sessions.
//!
//! A single `set` is atomic on its own, but a load-modify-save sequence is
//! not. Processes sharing a `FileStore` hold a `StoreLock` on the key's
//! sidecar `<key>.lock` file for the whole sequence: exclusive for writers,
//! shared for readers.

use crate::{Error, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Opaque string store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory key-value store
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// How a `StoreLock` is held
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    /// Any number of readers, no writer
    Shared,
    /// One writer, no readers
    Exclusive,
}

/// Advisory lock on a `FileStore` key, released on drop
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl StoreLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release {:?}: {}", self.path, e);
        }
    }
}

/// Directory-backed key-value store, one `<key>.json` file per key
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Config(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Block until `key` can be held in `mode`
    ///
    /// Creates the directory and the `<key>.lock` file if needed. The lock
    /// file itself is never removed.
    pub fn lock(&self, key: &str, mode: LockMode) -> Result<StoreLock> {
        let path = self.path_for(key)?.with_extension("lock");
        std::fs::create_dir_all(&self.dir)?;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        match mode {
            LockMode::Shared => file.lock_shared()?,
            LockMode::Exclusive => file.lock_exclusive()?,
        }

        tracing::debug!("Locked {:?} ({:?})", path, mode);
        Ok(StoreLock { file, path, mode })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        let mut contents = String::new();
        std::io::BufReader::new(file).read_to_string(&mut contents)?;

        tracing::debug!("Read {} bytes from {:?}", contents.len(), path);
        Ok(Some(contents))
    }

    /// Atomically writes the value by writing a temp file, syncing it to
    /// disk and renaming it over the old one
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Temp file in the same directory so the rename stays atomic
        let temp = NamedTempFile::new_in(&self.dir)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("workouts").unwrap(), None);

        store.set("workouts", "[]").unwrap();
        assert_eq!(store.get("workouts").unwrap().as_deref(), Some("[]"));

        store.remove("workouts").unwrap();
        store.remove("workouts").unwrap();
        assert_eq!(store.get("workouts").unwrap(), None);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path().join("data"));

        assert_eq!(store.get("workouts").unwrap(), None);

        store.set("workouts", r#"{"version":1}"#).unwrap();
        store.set("workouts", r#"{"version":1,"workouts":[]}"#).unwrap();
        assert_eq!(
            store.get("workouts").unwrap().as_deref(),
            Some(r#"{"version":1,"workouts":[]}"#)
        );

        store.remove("workouts").unwrap();
        assert_eq!(store.get("workouts").unwrap(), None);
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        store.set("workouts", "[]").unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "workouts.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only workouts.json, found extras: {:?}",
            extras
        );
    }

    #[test]
    fn test_exclusive_lock_blocks_other_holders() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path().join("data"));

        let guard = store.lock("workouts", LockMode::Exclusive).unwrap();
        assert_eq!(guard.path(), temp_dir.path().join("data").join("workouts.lock"));

        let other = File::open(guard.path()).unwrap();
        assert!(other.try_lock_shared().is_err());
        assert!(other.try_lock_exclusive().is_err());

        drop(guard);
        other.try_lock_exclusive().unwrap();
        other.unlock().unwrap();
    }

    #[test]
    fn test_shared_locks_coexist_but_exclude_writers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());

        let first = store.lock("workouts", LockMode::Shared).unwrap();
        let second = store.lock("workouts", LockMode::Shared).unwrap();
        assert_eq!(second.mode(), LockMode::Shared);

        let writer = File::open(first.path()).unwrap();
        assert!(writer.try_lock_exclusive().is_err());

        drop(first);
        drop(second);
        writer.try_lock_exclusive().unwrap();
    }

    #[test]
    fn test_lock_rejects_path_like_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        assert!(store.lock("../escape", LockMode::Exclusive).is_err());
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }
}
