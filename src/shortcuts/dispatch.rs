//! Listener registrations and fan-out.
//!
//! The table only knows Names. Resolving a key combination to Names is the
//! registry's job; the manager feeds the result into [`DispatchTable::matching`].

use std::collections::HashSet;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use super::name::Name;
use crate::hotkeys::{HotkeyHandler, KeyPhase};

/// Where a listener or recording session applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Only while the host application is frontmost.
    Local,
    /// Regardless of which application is frontmost.
    Global,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Local => f.write_str("local"),
            Scope::Global => f.write_str("global"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Target of an enable/disable toggle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchTarget {
    /// Every listener of a Name, present and future.
    Name(Name),
    /// One registration.
    Listener(ListenerId),
}

impl From<Name> for DispatchTarget {
    fn from(name: Name) -> Self {
        DispatchTarget::Name(name)
    }
}

impl From<ListenerId> for DispatchTarget {
    fn from(id: ListenerId) -> Self {
        DispatchTarget::Listener(id)
    }
}

struct Listener {
    id: ListenerId,
    name: Name,
    scope: Scope,
    phase: KeyPhase,
    enabled: bool,
    handler: HotkeyHandler,
}

/// Name → ordered listeners, plus a per-Name enable toggle layered on top.
#[derive(Default)]
pub struct DispatchTable {
    /// Registration order is invocation order.
    listeners: Vec<Listener>,
    disabled_names: HashSet<Name>,
    next_id: u64,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &Name,
        scope: Scope,
        phase: KeyPhase,
        handler: HotkeyHandler,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(Listener {
            id,
            name: name.clone(),
            scope,
            phase,
            enabled: true,
            handler,
        });
        debug!(name = %name, scope = %scope, listener = id.0, "Registered listener");
        id
    }

    /// Remove a listener, handing its handler back. `None` if it was
    /// already gone.
    ///
    /// The handler is returned rather than dropped because it may own
    /// handles whose drop locks the manager.
    pub fn unregister(&mut self, id: ListenerId) -> Option<HotkeyHandler> {
        let index = self.listeners.iter().position(|l| l.id == id)?;
        let listener = self.listeners.remove(index);
        debug!(listener = id.0, "Unregistered listener");
        Some(listener.handler)
    }

    /// Toggle dispatch without touching registrations.
    ///
    /// Returns false for an unknown listener id.
    pub fn set_enabled(&mut self, target: &DispatchTarget, enabled: bool) -> bool {
        match target {
            DispatchTarget::Name(name) => {
                if enabled {
                    self.disabled_names.remove(name);
                } else {
                    self.disabled_names.insert(name.clone());
                }
                true
            }
            DispatchTarget::Listener(id) => {
                match self.listeners.iter_mut().find(|l| l.id == *id) {
                    Some(listener) => {
                        listener.enabled = enabled;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    pub fn is_enabled(&self, target: &DispatchTarget) -> bool {
        match target {
            DispatchTarget::Name(name) => !self.disabled_names.contains(name),
            DispatchTarget::Listener(id) => self
                .listeners
                .iter()
                .find(|l| l.id == *id)
                .is_some_and(|l| l.enabled && !self.disabled_names.contains(&l.name)),
        }
    }

    pub fn listener_count(&self, name: &Name) -> usize {
        self.listeners.iter().filter(|l| l.name == *name).count()
    }

    /// Handlers to invoke for an event resolved to `names`.
    ///
    /// Global listeners always match; local listeners only while the app is
    /// active. Order is registration order within each Name, Names in the
    /// order given.
    pub fn matching(&self, names: &[Name], app_active: bool, phase: KeyPhase) -> Vec<HotkeyHandler> {
        let mut handlers = Vec::new();
        for name in names {
            if self.disabled_names.contains(name) {
                continue;
            }
            handlers.extend(
                self.listeners
                    .iter()
                    .filter(|l| l.name == *name && l.enabled && l.phase == phase)
                    .filter(|l| l.scope == Scope::Global || app_active)
                    .map(|l| l.handler.clone()),
            );
        }
        handlers
    }

    /// Enabled Names with at least one enabled global listener.
    pub fn global_names(&self) -> Vec<Name> {
        let mut seen = HashSet::new();
        self.listeners
            .iter()
            .filter(|l| l.scope == Scope::Global && l.enabled)
            .filter(|l| !self.disabled_names.contains(&l.name))
            .filter(|l| seen.insert(l.name.clone()))
            .map(|l| l.name.clone())
            .collect()
    }

    /// Remove everything, handing the handlers back to be dropped by the caller.
    pub fn clear(&mut self) -> Vec<HotkeyHandler> {
        self.disabled_names.clear();
        self.listeners.drain(..).map(|l| l.handler).collect()
    }
}

/// Scoped registration. Dropping it or calling [`ListenerHandle::release`]
/// detaches the listener; releasing twice is a no-op.
pub struct ListenerHandle {
    id: ListenerId,
    detach: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ListenerHandle {
    pub(crate) fn new(id: ListenerId, detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.detach.lock().is_none()
    }

    pub fn release(&self) {
        // Take first so the detach closure runs without our lock held.
        let detach = self.detach.lock().take();
        if let Some(detach) = detach {
            detach();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}
