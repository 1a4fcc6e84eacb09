//! JSON-file local store
//!
//! Keeps every user's records in one JSON document. The whole document is
//! rewritten through a temp file and renamed into place after each mutation,
//! so a crash mid-write leaves the previous version intact.

use crate::local::{LocalStore, UserRecords};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use yieldtick_core::error::Result;
use yieldtick_core::types::UserId;

/// File-backed local store
pub struct FileStore {
    /// Storage path
    path: PathBuf,

    /// In-memory copy of the document
    cache: RwLock<BTreeMap<UserId, UserRecords>>,
}

impl FileStore {
    /// Open existing or create new store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = if path.exists() {
            let content = std::fs::read(&path)?;
            if content.is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_slice(&content)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), users = cache.len(), "opened local accrual store");

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, cache: &BTreeMap<UserId, UserRecords>) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(cache)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, &serialized)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl LocalStore for FileStore {
    fn records(&self, user: &UserId) -> Result<UserRecords> {
        Ok(self.cache.read().get(user).cloned().unwrap_or_default())
    }

    fn update(&self, user: &UserId, mutation: &mut dyn FnMut(&mut UserRecords)) -> Result<()> {
        let mut cache = self.cache.write();
        let mut next = cache.clone();
        let records = next.entry(user.clone()).or_default();
        mutation(records);
        if records.is_empty() {
            next.remove(user);
        }

        // memory only changes once the document is on disk
        self.flush(&next)?;
        *cache = next;
        Ok(())
    }

    fn clear_user(&self, user: &UserId) -> Result<()> {
        let mut cache = self.cache.write();
        if !cache.contains_key(user) {
            return Ok(());
        }

        let mut next = cache.clone();
        next.remove(user);
        self.flush(&next)?;
        *cache = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yieldtick_core::types::{AccrualState, CooldownMarker};

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accrual.json");
        let user = UserId::new("42");
        let state = AccrualState::new_epoch(1_000, 12.5, 0.001, true);

        {
            let store = FileStore::open(&path).unwrap();
            store.save_accrual(&user, &state).unwrap();
            store.save_cooldown(&user, CooldownMarker { unlock_at: 77 }).unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.load_accrual(&user).unwrap(), Some(state));
        assert_eq!(reopened.load_cooldown(&user).unwrap(), Some(CooldownMarker { unlock_at: 77 }));
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = FileStore::open(&path).unwrap();
        store.set_last_synced(&UserId::new("a"), 10).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = FileStore::open(&path).err().unwrap();
        assert_eq!(err.code(), 3002);
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = FileStore::open(blocker.join("state.json")).unwrap();
        let user = UserId::new("a");
        let state = AccrualState::new_epoch(1_000, 3.0, 0.001, true);

        let err = store.save_accrual(&user, &state).unwrap_err();
        assert_eq!(err.code(), 3001);
        assert_eq!(store.load_accrual(&user).unwrap(), None);
    }
}
