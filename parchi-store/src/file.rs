//! JSON-file-backed store for the desktop host.
//!
//! The whole store is one JSON object, loaded at open and rewritten on
//! every mutation. The app persists a handful of small values, so a
//! full rewrite per mutation is fine.

use crate::{KvStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// A store persisted as a single JSON document.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `<data_dir>/parchi/store.json`, creating the
    /// directory if needed.
    pub fn open_default() -> StoreResult<Self> {
        let dir = dirs::data_dir().ok_or(StoreError::NoDataDir)?.join("parchi");
        fs::create_dir_all(&dir)?;
        Self::open(dir.join("store.json"))
    }

    /// Opens a store backed by `path`.
    ///
    /// A missing file starts empty. A corrupt file also starts empty
    /// after a warning: the license layer treats absent data as
    /// unactivated, never as trusted, so dropping an unreadable
    /// document is safe.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), "store file corrupt, starting empty: {e}");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the document atomically via a temp file rename.
    fn flush(&self, entries: &HashMap<String, String>) -> StoreResult<()> {
        let json = serde_json::to_string(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            return self.flush(&entries);
        }
        Ok(())
    }

    fn clear_all(&self) -> StoreResult<()> {
        let mut entries = self.lock();
        entries.clear();
        self.flush(&entries)
    }
}
