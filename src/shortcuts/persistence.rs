//! Shortcut persistence.
//!
//! Two layers:
//! - `StoreBackend` - a string-keyed get/set/delete interface (JSON file, memory)
//! - `ShortcutStore` - per-Name load/save/remove/reset on top of a backend
//!
//! Stored value per Name:
//! - encoded shortcut (`{"keyCode":40,"modifiers":9}`) = user binding
//! - `false` = user explicitly unbound this Name (its default stays off)
//! - missing = use the declared default

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::name::Name;
use super::types::Shortcut;
use crate::error::{ResultExt, ShortcutError};

/// Stored marker for an explicitly unbound Name.
const UNBOUND_MARKER: &str = "false";

/// Error that can occur when reading/writing a backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for ShortcutError {
    fn from(e: StoreError) -> Self {
        ShortcutError::StoreUnavailable(e.to_string())
    }
}

/// Durable key-value storage for encoded shortcuts.
///
/// Implementations must make every write atomic with respect to concurrent
/// reads.
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

// =============================================================================
// JSON file backend
// =============================================================================

/// On-disk layout of the JSON file backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Stores all entries in a single JSON file, rewritten atomically
/// (write temp + rename) on every change.
///
/// The file is read once, on first access. A corrupt file is logged and
/// treated as empty; the next successful write replaces it.
pub struct JsonFileBackend {
    path: PathBuf,
    entries: RwLock<Option<BTreeMap<String, String>>>,
    write_lock: Mutex<()>,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> BTreeMap<String, String> {
        if !path.exists() {
            return BTreeMap::new();
        }
        let parsed = fs::read_to_string(path)
            .map_err(StoreError::from)
            .and_then(|content| serde_json::from_str::<StoreFile>(&content).map_err(Into::into));
        match parsed {
            Ok(file) => {
                debug!(path = %path.display(), count = file.entries.len(), "Loaded shortcut store");
                file.entries
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Shortcut store unreadable, treating as empty");
                BTreeMap::new()
            }
        }
    }

    fn ensure_loaded(&self) {
        if self.entries.read().is_some() {
            return;
        }
        let mut guard = self.entries.write();
        if guard.is_none() {
            *guard = Some(Self::read_file(&self.path));
        }
    }

    fn write_file(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&StoreFile {
            entries: entries.clone(),
        })?;

        // Atomic write: temp file then rename
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        debug!(path = %self.path.display(), bytes = json.len(), "Saved shortcut store (atomic)");
        Ok(())
    }

    /// Apply a change to a copy, persist it, then publish it to readers.
    ///
    /// If the write fails the change is still published in memory so the
    /// binding stays usable for this process.
    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StoreError> {
        self.ensure_loaded();
        let _writer = self.write_lock.lock();
        let mut next = self.entries.read().clone().unwrap_or_default();
        change(&mut next);
        let result = self.write_file(&next);
        *self.entries.write() = Some(next);
        result
    }
}

impl StoreBackend for JsonFileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.ensure_loaded();
        Ok(self
            .entries
            .read()
            .as_ref()
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.ensure_loaded();
        Ok(self
            .entries
            .read()
            .as_ref()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

/// Process-local backend. Writes can be made to fail to exercise the
/// degraded-durability paths.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
    unavailable: std::sync::atomic::AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable
            .store(unavailable, std::sync::atomic::Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory backend disabled".to_string()));
        }
        Ok(())
    }

    /// Write a raw value, bypassing encoding. Used to simulate corrupt data.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }
}

impl StoreBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check()?;
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.check()?;
        Ok(self.entries.read().keys().cloned().collect())
    }
}

impl<B: StoreBackend + ?Sized> StoreBackend for std::sync::Arc<B> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }
}

// =============================================================================
// Shortcut store
// =============================================================================

/// What the backend holds for a Name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoredEntry {
    /// Nothing stored: the declared default applies.
    Missing,
    /// Explicitly unbound by the user.
    Unbound,
    Bound(Shortcut),
}

/// Name-level persistence on top of a [`StoreBackend`].
///
/// Reads never fail: an unreadable backend or a malformed value is logged and
/// reported as "no shortcut".
pub struct ShortcutStore {
    backend: Box<dyn StoreBackend>,
    key_prefix: String,
}

impl ShortcutStore {
    pub fn new(backend: impl StoreBackend + 'static, key_prefix: impl Into<String>) -> Self {
        Self {
            backend: Box::new(backend),
            key_prefix: key_prefix.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            MemoryBackend::new(),
            crate::config::DEFAULT_STORE_KEY_PREFIX,
        )
    }

    fn key_for(&self, name: &Name) -> String {
        format!("{}{}", self.key_prefix, name.id())
    }

    /// Raw stored state for a Name.
    pub fn stored(&self, name: &Name) -> StoredEntry {
        let Some(raw) = self.backend.get(&self.key_for(name)).warn_on_err().flatten() else {
            return StoredEntry::Missing;
        };
        if raw == UNBOUND_MARKER {
            return StoredEntry::Unbound;
        }
        match Shortcut::decode(&raw) {
            Ok(shortcut) => StoredEntry::Bound(shortcut),
            Err(e) => {
                warn!(name = %name, error = %e, "Ignoring malformed stored shortcut");
                StoredEntry::Unbound
            }
        }
    }

    /// Effective shortcut for a Name: stored binding, else declared default.
    pub fn load(&self, name: &Name) -> Option<Shortcut> {
        match self.stored(name) {
            StoredEntry::Bound(shortcut) => Some(shortcut),
            StoredEntry::Unbound => None,
            StoredEntry::Missing => name.default_shortcut(),
        }
    }

    #[instrument(skip_all, fields(name = %name, shortcut = %shortcut.to_canonical_string()))]
    pub fn save(&self, name: &Name, shortcut: &Shortcut) -> Result<(), ShortcutError> {
        self.backend.set(&self.key_for(name), &shortcut.encode())?;
        info!("Saved shortcut");
        Ok(())
    }

    /// Unbind a Name. The default does not come back until [`ShortcutStore::reset`].
    #[instrument(skip_all, fields(name = %name))]
    pub fn remove(&self, name: &Name) -> Result<(), ShortcutError> {
        self.backend.set(&self.key_for(name), UNBOUND_MARKER)?;
        info!("Removed shortcut");
        Ok(())
    }

    /// Forget the user's choice so the declared default applies again.
    #[instrument(skip_all, fields(name = %name))]
    pub fn reset(&self, name: &Name) -> Result<(), ShortcutError> {
        self.backend.delete(&self.key_for(name))?;
        info!("Reset shortcut to default");
        Ok(())
    }

    /// Persist an in-memory value: bound, or explicitly unbound.
    pub fn write(&self, name: &Name, shortcut: Option<&Shortcut>) -> Result<(), ShortcutError> {
        match shortcut {
            Some(shortcut) => self.save(name, shortcut),
            None => self.remove(name),
        }
    }

    /// Identifiers of every Name with a stored value.
    pub fn stored_names(&self) -> Vec<String> {
        self.backend
            .keys()
            .warn_on_err()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.key_prefix).map(str::to_string))
            .collect()
    }
}

/// Get the default path for the shortcut store.
pub fn default_store_path() -> PathBuf {
    crate::config::expand_path(crate::config::DEFAULT_STORE_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcuts::{Key, Modifiers};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn cmd_k() -> Shortcut {
        Shortcut::new(Key::K, Modifiers::COMMAND)
    }

    fn memory_store() -> (Arc<MemoryBackend>, ShortcutStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = ShortcutStore::new(backend.clone(), "test_");
        (backend, store)
    }

    #[test]
    fn save_load_remove() {
        let (_, store) = memory_store();
        let name = Name::new("toggle");

        assert_eq!(store.load(&name), None);
        store.save(&name, &cmd_k()).unwrap();
        assert_eq!(store.load(&name), Some(cmd_k()));
        store.remove(&name).unwrap();
        assert_eq!(store.load(&name), None);
        assert_eq!(store.stored(&name), StoredEntry::Unbound);
    }

    #[test]
    fn remove_keeps_default_off_until_reset() {
        let (_, store) = memory_store();
        let name = Name::with_default("toggle", cmd_k());

        assert_eq!(store.load(&name), Some(cmd_k()));
        store.remove(&name).unwrap();
        assert_eq!(store.load(&name), None);
        store.reset(&name).unwrap();
        assert_eq!(store.load(&name), Some(cmd_k()));
        assert_eq!(store.stored(&name), StoredEntry::Missing);
    }

    #[test]
    fn reset_without_default_unbinds() {
        let (_, store) = memory_store();
        let name = Name::new("plain");
        store.save(&name, &cmd_k()).unwrap();
        store.reset(&name).unwrap();
        assert_eq!(store.load(&name), None);
    }

    #[test]
    fn malformed_value_reads_as_absent() {
        let (backend, store) = memory_store();
        let name = Name::with_default("broken", cmd_k());
        backend.insert_raw("test_broken", "{not json");
        assert_eq!(store.load(&name), None);
    }

    #[test]
    fn unavailable_backend_degrades() {
        let (backend, store) = memory_store();
        let name = Name::new("toggle");
        store.save(&name, &cmd_k()).unwrap();

        backend.set_unavailable(true);
        assert_eq!(store.load(&name), None);
        assert!(matches!(
            store.save(&name, &cmd_k()),
            Err(ShortcutError::StoreUnavailable(_))
        ));
        assert!(store.stored_names().is_empty());
    }

    #[test]
    fn stored_names_strip_prefix() {
        let (backend, store) = memory_store();
        store.save(&Name::new("a"), &cmd_k()).unwrap();
        store.remove(&Name::new("b")).unwrap();
        backend.insert_raw("other_c", "false");
        let mut names = store.stored_names();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn json_file_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("shortcuts.json");
        let name = Name::new("toggle");

        let store = ShortcutStore::new(JsonFileBackend::new(&path), "shortcut_");
        store.save(&name, &cmd_k()).unwrap();
        store.remove(&Name::new("off")).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = ShortcutStore::new(JsonFileBackend::new(&path), "shortcut_");
        assert_eq!(reopened.load(&name), Some(cmd_k()));
        assert_eq!(reopened.stored(&Name::new("off")), StoredEntry::Unbound);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("shortcut_toggle"));
        assert!(content.contains("false"));
    }

    #[test]
    fn corrupt_file_is_treated_as_empty_and_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shortcuts.json");
        fs::write(&path, "this is not json").unwrap();

        let store = ShortcutStore::new(JsonFileBackend::new(&path), "shortcut_");
        let name = Name::new("toggle");
        assert_eq!(store.load(&name), None);

        store.save(&name, &cmd_k()).unwrap();
        let reopened = ShortcutStore::new(JsonFileBackend::new(&path), "shortcut_");
        assert_eq!(reopened.load(&name), Some(cmd_k()));
    }

    #[test]
    fn failed_write_still_updates_memory() {
        let dir = tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("shortcuts.json");
        fs::create_dir_all(path.join("blocker")).unwrap();

        let backend = JsonFileBackend::new(&path);
        assert!(backend.set("k", "v").is_err());
        assert_eq!(backend.get("k").unwrap(), Some("v".to_string()));
    }
}
