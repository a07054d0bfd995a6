// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Local key-value storage
//
// Each named slot is a JSON document. The file store keeps one file per
// slot in the data directory; the memory store backs tests and hosts
// that do not want anything on disk.

use crate::types::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Named-slot storage holding raw JSON strings
pub trait KeyValueStore: Send + Sync {
    /// Read a slot. A missing slot is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Delete a slot. Deleting a missing slot is not an error.
    fn remove(&self, key: &str) -> Result<(), AppError>;

    /// File to lock when other processes share this store. None for stores
    /// private to the current process.
    fn lock_file(&self, _key: &str) -> Result<Option<File>, AppError> {
        Ok(None)
    }
}

/// Exclusive hold on a slot, released on drop
pub struct SlotLock {
    _file: Option<File>,
}

/// Wait for exclusive access to a slot across processes sharing the store
pub async fn lock_slot<S>(store: &S, key: &str) -> Result<SlotLock, AppError>
where
    S: KeyValueStore + ?Sized,
{
    let file = match store.lock_file(key)? {
        Some(file) => file,
        None => return Ok(SlotLock { _file: None }),
    };

    let file = tokio::task::spawn_blocking(move || file.lock().map(|()| file))
        .await
        .map_err(|e| AppError::FileIo(format!("Lock task for {} failed: {}", key, e)))?
        .map_err(|e| AppError::FileIo(format!("Failed to lock {}: {}", key, e)))?;

    Ok(SlotLock { _file: Some(file) })
}

/// Read and decode a slot
pub fn read_json<T, S>(store: &S, key: &str) -> Result<Option<T>, AppError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(content) => {
            let value = serde_json::from_str(&content).map_err(|e| {
                AppError::Serialization(format!("Failed to parse slot {}: {}", key, e))
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Encode and write a slot
pub fn write_json<T, S>(store: &S, key: &str, value: &T) -> Result<(), AppError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let content = serde_json::to_string(value)
        .map_err(|e| AppError::Serialization(format!("Failed to serialize slot {}: {}", key, e)))?;
    store.set(key, &content)
}

/// File-based store, one `<key>.json` per slot
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::FileIo(format!("Failed to create data dir: {}", e)))?;
        tracing::debug!("Key-value store at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, AppError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(AppError::InvalidConfig(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::FileIo(format!("Failed to read {}: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let path = self.slot_path(key)?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, value)
            .map_err(|e| AppError::FileIo(format!("Failed to write {}: {}", key, e)))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| AppError::FileIo(format!("Failed to replace {}: {}", key, e)))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let path = self.slot_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::FileIo(format!("Failed to remove {}: {}", key, e))),
        }
    }

    fn lock_file(&self, key: &str) -> Result<Option<File>, AppError> {
        let path = self.slot_path(key)?.with_extension("lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| AppError::FileIo(format!("Failed to open lock for {}: {}", key, e)))?;
        Ok(Some(file))
    }
}

/// In-memory store. Counts writes so callers can observe no-op passes.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    slots: RwLock<HashMap<String, String>>,
    writes: RwLock<usize>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls so far
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        *self.writes.write().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileKeyValueStore::open(dir.path()).unwrap();
        assert_eq!(store.get("salesToRetry").unwrap(), None);
        store.set("salesToRetry", "[]").unwrap();

        let reopened = FileKeyValueStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("salesToRetry").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("salesToRetry.json").exists());
        assert!(!dir.path().join("salesToRetry.json.tmp").exists());
    }

    #[test]
    fn test_file_store_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();
        store.remove("pos").unwrap();
        store.set("pos", "{}").unwrap();
        store.remove("pos").unwrap();
        assert_eq!(store.get("pos").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set("../escape", "{}"),
            Err(AppError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_lock_excludes_second_store() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileKeyValueStore::open(dir.path()).unwrap();
        let second = FileKeyValueStore::open(dir.path()).unwrap();

        let held = lock_slot(&first, "salesToRetry").await.unwrap();
        let waiting = tokio::spawn(async move {
            let _guard = lock_slot(&second, "salesToRetry").await.unwrap();
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(held);
        waiting.await.unwrap();
        assert!(dir.path().join("salesToRetry.lock").exists());
    }

    #[tokio::test]
    async fn test_memory_store_lock_is_free() {
        let store = MemoryKeyValueStore::new();
        let _a = lock_slot(&store, "salesToRetry").await.unwrap();
        let _b = lock_slot(&store, "salesToRetry").await.unwrap();
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_json_helpers() {
        let store = MemoryKeyValueStore::new();
        let missing: Option<Vec<u32>> = read_json(&store, "numbers").unwrap();
        assert!(missing.is_none());

        write_json(&store, "numbers", &vec![1u32, 2, 3]).unwrap();
        let numbers: Option<Vec<u32>> = read_json(&store, "numbers").unwrap();
        assert_eq!(numbers, Some(vec![1, 2, 3]));
        assert_eq!(store.write_count(), 1);

        store.set("numbers", "not json").unwrap();
        let broken: Result<Option<Vec<u32>>, _> = read_json(&store, "numbers");
        assert!(matches!(broken, Err(AppError::Serialization(_))));
    }
}
