//! Process-wide Name → Shortcut table.
//!
//! Uses Vec for deterministic iteration order and HashMap for O(1) lookup.
//! Entries are loaded lazily from the store on first access and cached for
//! the life of the registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::name::Name;
use super::persistence::ShortcutStore;
use super::types::Shortcut;

struct Entry {
    name: Name,
    /// `None` until first access, then the cached binding.
    cached: Option<Option<Shortcut>>,
    /// The cached value came from [`NameRegistry::set`], not a store load.
    written: bool,
}

/// Central table of declared Names and their live shortcuts.
///
/// Only writes the in-memory cache; persisting is the caller's job so store
/// I/O can happen outside the caller's lock.
pub struct NameRegistry {
    entries: Vec<Entry>,
    id_to_index: HashMap<String, usize>,
    store: Arc<ShortcutStore>,
}

impl NameRegistry {
    pub fn new(store: Arc<ShortcutStore>) -> Self {
        Self {
            entries: Vec::new(),
            id_to_index: HashMap::new(),
            store,
        }
    }

    pub fn store(&self) -> &Arc<ShortcutStore> {
        &self.store
    }

    /// Declare a Name. Re-declaring keeps the first declared default.
    ///
    /// Lookups through a plain `Name::new(id)` declare it implicitly without
    /// a default; a later declaration carrying one fills it in.
    ///
    /// Returns the declared Name (with its default).
    pub fn declare(&mut self, name: &Name) -> Name {
        if let Some(&index) = self.id_to_index.get(name.id()) {
            let entry = &mut self.entries[index];
            if let (None, Some(default)) = (entry.name.default_shortcut(), name.default_shortcut()) {
                entry.name.set_default(Some(default));
                if !entry.written {
                    entry.cached = None;
                }
                debug!(name = %name, default = ?default, "Adopted default for implicitly declared name");
            }
            return entry.name.clone();
        }
        let index = self.entries.len();
        self.entries.push(Entry {
            name: name.clone(),
            cached: None,
            written: false,
        });
        self.id_to_index.insert(name.id().to_string(), index);
        debug!(name = %name, default = ?name.default_shortcut(), "Declared shortcut name");
        name.clone()
    }

    pub fn is_declared(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    /// The declared form of a Name (carrying its default), if any.
    pub fn declared(&self, id: &str) -> Option<&Name> {
        self.id_to_index.get(id).map(|&i| &self.entries[i].name)
    }

    fn index_of(&mut self, name: &Name) -> usize {
        match self.id_to_index.get(name.id()) {
            Some(&index) => index,
            None => {
                self.declare(name);
                self.entries.len() - 1
            }
        }
    }

    /// Current binding, loading from the store on first access.
    pub fn current(&mut self, name: &Name) -> Option<Shortcut> {
        let index = self.index_of(name);
        let entry = &mut self.entries[index];
        if let Some(cached) = entry.cached {
            return cached;
        }
        let loaded = self.store.load(&entry.name);
        entry.cached = Some(loaded);
        loaded
    }

    /// Current binding without declaring the Name or filling the cache.
    pub fn peek(&self, name: &Name) -> Option<Shortcut> {
        match self.id_to_index.get(name.id()) {
            Some(&index) => {
                let entry = &self.entries[index];
                entry.cached.unwrap_or_else(|| self.store.load(&entry.name))
            }
            None => self.store.load(name),
        }
    }

    /// Set the cached binding (memory only).
    pub fn set(&mut self, name: &Name, shortcut: Option<Shortcut>) {
        let index = self.index_of(name);
        let entry = &mut self.entries[index];
        entry.cached = Some(shortcut);
        entry.written = true;
    }

    /// Drop the cached value so the next read goes back to the store.
    pub fn invalidate(&mut self, name: &Name) {
        if let Some(&index) = self.id_to_index.get(name.id()) {
            let entry = &mut self.entries[index];
            entry.cached = None;
            entry.written = false;
        }
    }

    /// Change a Name's declared default. A cached value is dropped so the next
    /// read re-resolves stored value vs. new default.
    pub fn set_default(&mut self, name: &Name, default: Option<Shortcut>) -> Name {
        let index = self.index_of(name);
        let entry = &mut self.entries[index];
        entry.name.set_default(default);
        entry.cached = None;
        entry.written = false;
        entry.name.clone()
    }

    /// All declared Names in declaration order.
    pub fn names(&self) -> Vec<Name> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Reverse lookup: every declared Name currently bound to `shortcut`.
    ///
    /// Normally at most one; more only if the host bound the same shortcut
    /// twice through the direct API.
    pub fn names_bound_to(&mut self, shortcut: &Shortcut) -> Vec<Name> {
        let names = self.names();
        names
            .into_iter()
            .filter(|name| self.current(name).as_ref() == Some(shortcut))
            .collect()
    }

    /// First Name other than `except` bound to `shortcut`.
    pub fn bound_elsewhere(&mut self, shortcut: &Shortcut, except: &Name) -> Option<Name> {
        self.names_bound_to(shortcut)
            .into_iter()
            .find(|name| name != except)
    }

    /// Forget every cached value and declaration. Test support.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.id_to_index.clear();
    }
}
