//! Host and UI facing entry point of the shortcut system.
//!
//! One `Mutex<Shared>` guards the registry cache, the recorder slot, the
//! dispatch table and the OS hook. Three kinds of work never run under it:
//! - reserved-catalog snapshots (menu introspection can be slow)
//! - store writes
//! - handler and `on_change` callbacks, so they may call back in
//!
//! Lock order: `Shared` only. Nothing here takes a second lock while holding it.
//! Sessions and handlers removed under the lock own user closures, which may
//! own handles that lock again on drop; they are parked in `Shared::retired`
//! and dropped by [`SharedGuard`] after unlocking.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use super::dispatch::{DispatchTable, DispatchTarget, ListenerHandle, Scope};
use super::name::Name;
use super::persistence::{JsonFileBackend, ShortcutStore};
use super::recorder::{
    validate_candidate, CommittedSession, Recorder, RecorderInput, RecorderState,
    RecordingSnapshot, Rejection, SessionId,
};
use super::registry::NameRegistry;
use super::reserved::{NoMenus, ReservedCatalog, ReservedCatalogProvider, ReservedEntry};
use super::types::{Platform, Shortcut};
use crate::config::Config;
use crate::error::{Result, ShortcutError};
use crate::hotkeys::{HotkeyHandler, KeyEvent, KeyEventHook, KeyPhase, NoopHook};

/// Undrained rejection notices beyond this are dropped.
const REJECTION_CHANNEL_CAPACITY: usize = 64;

/// Whether a write reached the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Durability {
    Durable,
    /// Bound for this process only; the store write failed.
    MemoryOnly,
}

/// Outcome of a successful write to a Name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReport {
    pub name: Name,
    pub shortcut: Option<Shortcut>,
    pub previous: Option<Shortcut>,
    /// Name that lost the shortcut through a confirmed override.
    pub unbound: Option<Name>,
    pub durability: Durability,
}

/// Published on [`ShortcutManager::rejections`] for every rejected candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectionNotice {
    pub name: Name,
    pub shortcut: Shortcut,
    pub reason: Rejection,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecorderOutcome {
    /// Live modifier display changed.
    Updated,
    Ignored,
    Rejected(Rejection),
    Committed(CommitReport),
    Cancelled,
    /// The session ended or was replaced while this event was in flight.
    Superseded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyEventOutcome {
    Ignored,
    /// Number of handlers invoked.
    Dispatched(usize),
    Recorder(RecorderOutcome),
}

struct Shared {
    registry: NameRegistry,
    recorder: Recorder,
    dispatch: DispatchTable,
    hook: Box<dyn KeyEventHook>,
    /// Dropped once the lock is released.
    retired: Vec<Box<dyn Send>>,
}

impl Shared {
    fn retire(&mut self, value: impl Send + 'static) {
        self.retired.push(Box::new(value));
    }

    fn expire_idle_session(&mut self) {
        if let Some(session) = self.recorder.expire_idle(Instant::now()) {
            self.retire(session);
            self.refresh_hook();
        }
    }

    /// Bring the OS hook in line with what currently needs global delivery.
    ///
    /// While a session is active the recorder owns the keyboard, so bound
    /// global shortcuts are withdrawn.
    fn refresh_hook(&mut self) {
        let session_scope = self.recorder.active().map(|s| s.scope());
        let mut bindings: Vec<Shortcut> = Vec::new();
        if session_scope.is_none() {
            for name in self.dispatch.global_names() {
                if let Some(shortcut) = self.registry.current(&name) {
                    if !bindings.contains(&shortcut) {
                        bindings.push(shortcut);
                    }
                }
            }
        }

        let needed = !bindings.is_empty() || session_scope == Some(Scope::Global);
        if !needed {
            if self.hook.is_installed() {
                self.hook.uninstall();
                debug!("Key event hook uninstalled");
            }
            return;
        }
        if !self.hook.is_installed() {
            if let Err(e) = self.hook.install() {
                warn!(error = %e, "Key event hook unavailable, global shortcuts disabled");
                return;
            }
            debug!("Key event hook installed");
        }
        self.hook.update_bindings(&bindings);
    }

    fn sync_session_bound(&mut self, name: &Name, value: Option<Shortcut>) {
        if let Some(session) = self.recorder.active_mut() {
            if session.name() == name {
                session.set_bound(value);
            }
        }
    }
}

struct PendingCommit {
    committed: CommittedSession,
    unbound: Option<Name>,
}

/// Lock guard over [`Shared`] that drops retired values after unlocking.
struct SharedGuard<'a>(MutexGuard<'a, Shared>);

impl Deref for SharedGuard<'_> {
    type Target = Shared;

    fn deref(&self) -> &Shared {
        &self.0
    }
}

impl DerefMut for SharedGuard<'_> {
    fn deref_mut(&mut self) -> &mut Shared {
        &mut self.0
    }
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        if self.0.retired.is_empty() {
            return;
        }
        let retired = std::mem::take(&mut self.0.retired);
        MutexGuard::unlocked(&mut self.0, move || drop(retired));
    }
}

struct Inner {
    shared: Mutex<Shared>,
    store: Arc<ShortcutStore>,
    catalog: ReservedCatalog,
    rejections_tx: async_channel::Sender<RejectionNotice>,
    rejections_rx: async_channel::Receiver<RejectionNotice>,
}

impl Inner {
    fn lock(&self) -> SharedGuard<'_> {
        SharedGuard(self.shared.lock())
    }

    fn cancel_session(&self, id: Option<SessionId>, reason: &str) -> bool {
        let mut shared = self.lock();
        match shared.recorder.cancel(id, reason) {
            Some(session) => {
                shared.retire(session);
                shared.refresh_hook();
                true
            }
            None => false,
        }
    }
}

/// Builder for [`ShortcutManager`].
pub struct ShortcutManagerBuilder {
    store: Option<ShortcutStore>,
    provider: Arc<dyn ReservedCatalogProvider>,
    hook: Box<dyn KeyEventHook>,
    platform: Platform,
    recording_timeout: Option<Duration>,
}

impl Default for ShortcutManagerBuilder {
    fn default() -> Self {
        Self {
            store: None,
            provider: Arc::new(NoMenus),
            hook: Box::new(NoopHook::default()),
            platform: Platform::current(),
            recording_timeout: None,
        }
    }
}

impl ShortcutManagerBuilder {
    /// JSON file store, platform and idle timeout from `config`.
    pub fn from_config(config: &Config) -> Self {
        let store = ShortcutStore::new(
            JsonFileBackend::new(config.store.resolved_path()),
            config.store.key_prefix.clone(),
        );
        Self {
            store: Some(store),
            platform: config.platform(),
            recording_timeout: config.recording_timeout(),
            ..Self::default()
        }
    }

    pub fn store(mut self, store: ShortcutStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn provider(mut self, provider: impl ReservedCatalogProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn shared_provider(mut self, provider: Arc<dyn ReservedCatalogProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn hook(mut self, hook: impl KeyEventHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn recording_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recording_timeout = timeout;
        self
    }

    pub fn build(self) -> ShortcutManager {
        let store = Arc::new(self.store.unwrap_or_else(ShortcutStore::in_memory));
        let (rejections_tx, rejections_rx) = async_channel::bounded(REJECTION_CHANNEL_CAPACITY);
        let shared = Shared {
            registry: NameRegistry::new(store.clone()),
            recorder: Recorder::new(self.recording_timeout),
            dispatch: DispatchTable::new(),
            hook: self.hook,
            retired: Vec::new(),
        };
        info!(platform = ?self.platform, "Shortcut manager ready");
        ShortcutManager {
            inner: Arc::new(Inner {
                shared: Mutex::new(shared),
                store,
                catalog: ReservedCatalog::new(self.platform, self.provider),
                rejections_tx,
                rejections_rx,
            }),
        }
    }
}

/// Shared handle to the shortcut system. Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct ShortcutManager {
    inner: Arc<Inner>,
}

impl ShortcutManager {
    pub fn builder() -> ShortcutManagerBuilder {
        ShortcutManagerBuilder::default()
    }

    /// In-memory store, no menus, no OS hook.
    pub fn in_memory() -> Self {
        Self::builder().build()
    }

    pub fn platform(&self) -> Platform {
        self.inner.catalog.platform()
    }

    pub fn store(&self) -> &Arc<ShortcutStore> {
        &self.inner.store
    }

    // =========================================================================
    // Names and bindings
    // =========================================================================

    /// Declare a Name. Returns the declared form (first declaration's default).
    pub fn declare(&self, name: &Name) -> Name {
        self.inner.lock().registry.declare(name)
    }

    /// Declared Names in declaration order.
    pub fn names(&self) -> Vec<Name> {
        self.inner.lock().registry.names()
    }

    pub fn current_shortcut(&self, name: &Name) -> Option<Shortcut> {
        let mut shared = self.inner.lock();
        shared.registry.current(name)
    }

    /// Change a Name's declared default. Takes effect immediately unless the
    /// user stored their own choice.
    pub fn set_default(&self, name: &Name, default: Shortcut) -> Name {
        let mut shared = self.inner.lock();
        let declared = shared.registry.set_default(name, Some(default));
        let current = shared.registry.current(&declared);
        shared.sync_session_bound(&declared, current);
        shared.refresh_hook();
        declared
    }

    /// Bind directly, bypassing the recorder.
    ///
    /// Only the combination invariant is checked. Use [`ShortcutManager::validate`]
    /// first for reserved and conflict checks.
    #[instrument(skip_all, fields(name = %name, shortcut = %shortcut.to_canonical_string()))]
    pub fn set_shortcut(&self, name: &Name, shortcut: Shortcut) -> Result<CommitReport> {
        if !shortcut.is_valid() {
            return Err(ShortcutError::InvalidCombination);
        }
        Ok(self.write_direct(name, Some(shortcut)))
    }

    /// Unbind a Name. Its default stays off until [`ShortcutManager::reset`].
    #[instrument(skip_all, fields(name = %name))]
    pub fn remove(&self, name: &Name) -> CommitReport {
        self.write_direct(name, None)
    }

    /// Restore the declared default, or leave the Name unbound if it has none.
    #[instrument(skip_all, fields(name = %name))]
    pub fn reset(&self, name: &Name) -> CommitReport {
        let (declared, previous, default) = {
            let mut shared = self.inner.lock();
            let declared = shared.registry.declare(name);
            let previous = shared.registry.current(&declared);
            let default = declared.default_shortcut();
            shared.registry.set(&declared, default);
            shared.sync_session_bound(&declared, default);
            shared.refresh_hook();
            (declared, previous, default)
        };
        let durability = match self.inner.store.reset(&declared) {
            Ok(()) => Durability::Durable,
            Err(e) => {
                warn!(name = %declared, error = %e, "Reset applied in memory only");
                Durability::MemoryOnly
            }
        };
        CommitReport {
            name: declared,
            shortcut: default,
            previous,
            unbound: None,
            durability,
        }
    }

    /// Reset every declared Name and every Name with a stored value.
    pub fn reset_all(&self) -> Vec<CommitReport> {
        let mut names = self.names();
        for id in self.inner.store.stored_names() {
            let name = Name::new(id);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        info!(count = names.len(), "Resetting all shortcuts");
        names.iter().map(|name| self.reset(name)).collect()
    }

    fn write_direct(&self, name: &Name, value: Option<Shortcut>) -> CommitReport {
        let (declared, previous) = {
            let mut shared = self.inner.lock();
            shared.expire_idle_session();
            let declared = shared.registry.declare(name);
            let previous = shared.registry.current(&declared);
            shared.registry.set(&declared, value);
            shared.sync_session_bound(&declared, value);
            shared.refresh_hook();
            (declared, previous)
        };
        let durability = self.persist(&[(declared.clone(), value)]);
        CommitReport {
            name: declared,
            shortcut: value,
            previous,
            unbound: None,
            durability,
        }
    }

    fn persist(&self, changes: &[(Name, Option<Shortcut>)]) -> Durability {
        let mut durability = Durability::Durable;
        for (name, value) in changes {
            if let Err(e) = self.inner.store.write(name, value.as_ref()) {
                warn!(name = %name, error = %e, "Shortcut bound in memory only");
                durability = Durability::MemoryOnly;
            }
        }
        durability
    }

    // =========================================================================
    // Reserved combinations and validation
    // =========================================================================

    pub fn is_reserved(&self, shortcut: &Shortcut) -> Option<ReservedEntry> {
        self.inner.catalog.is_reserved(shortcut)
    }

    /// Run the recorder's checks for binding `shortcut` to `name`.
    pub fn validate(&self, name: &Name, shortcut: &Shortcut) -> Result<()> {
        let reserved = self.inner.catalog.snapshot();
        let mut shared = self.inner.lock();
        validate_candidate(shortcut, &reserved, |s| {
            shared.registry.bound_elsewhere(s, name)
        })
        .map_err(ShortcutError::from)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Register a key-down handler.
    pub fn register(
        &self,
        name: &Name,
        scope: Scope,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.register_for_phase(name, scope, KeyPhase::Down, handler)
    }

    pub fn register_for_phase(
        &self,
        name: &Name,
        scope: Scope,
        phase: KeyPhase,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> ListenerHandle {
        let handler: HotkeyHandler = Arc::new(handler);
        let id = {
            let mut shared = self.inner.lock();
            shared.registry.declare(name);
            let id = shared.dispatch.register(name, scope, phase, handler);
            shared.refresh_hook();
            id
        };
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        ListenerHandle::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                let mut shared = inner.lock();
                if let Some(handler) = shared.dispatch.unregister(id) {
                    shared.retire(handler);
                }
                shared.refresh_hook();
            }
        })
    }

    /// Enable or disable a Name or a single listener. Registrations are kept.
    pub fn set_enabled(&self, target: impl Into<DispatchTarget>, enabled: bool) -> bool {
        let target = target.into();
        let mut shared = self.inner.lock();
        let found = shared.dispatch.set_enabled(&target, enabled);
        shared.refresh_hook();
        debug!(target = ?target, enabled = enabled, "Dispatch toggle");
        found
    }

    pub fn is_enabled(&self, target: impl Into<DispatchTarget>) -> bool {
        self.inner.lock().dispatch.is_enabled(&target.into())
    }

    /// Dispatch a key-down of `shortcut`. Returns the number of handlers run.
    pub fn post(&self, shortcut: &Shortcut, app_active: bool) -> usize {
        self.dispatch(shortcut, app_active, KeyPhase::Down)
    }

    fn dispatch(&self, shortcut: &Shortcut, app_active: bool, phase: KeyPhase) -> usize {
        let handlers = {
            let mut shared = self.inner.lock();
            shared.expire_idle_session();
            if shared.recorder.active().is_some() {
                debug!(shortcut = %shortcut.to_canonical_string(), "Dispatch paused while recording");
                return 0;
            }
            let names = shared.registry.names_bound_to(shortcut);
            if names.is_empty() {
                return 0;
            }
            shared.dispatch.matching(&names, app_active, phase)
        };
        for handler in &handlers {
            handler();
        }
        debug!(
            shortcut = %shortcut.to_canonical_string(),
            app_active = app_active,
            count = handlers.len(),
            "Dispatched shortcut"
        );
        handlers.len()
    }

    /// Entry point for the event source: route a raw key event to the active
    /// recording session, or to dispatch.
    pub fn handle_key_event(&self, event: KeyEvent, app_active: bool) -> KeyEventOutcome {
        let session = {
            let mut shared = self.inner.lock();
            shared.expire_idle_session();
            match shared.recorder.active() {
                Some(s) if s.scope() == Scope::Global || app_active => Some(s.id()),
                // A local recorder only listens while the app is frontmost.
                Some(_) => return KeyEventOutcome::Ignored,
                None => None,
            }
        };

        if let Some(id) = session {
            return KeyEventOutcome::Recorder(self.feed_recorder(id, &event));
        }
        if event.is_repeat {
            return KeyEventOutcome::Ignored;
        }
        match event.phase {
            KeyPhase::FlagsChanged => KeyEventOutcome::Ignored,
            phase => KeyEventOutcome::Dispatched(self.dispatch(&event.shortcut(), app_active, phase)),
        }
    }

    // =========================================================================
    // Recording
    // =========================================================================

    /// Start recording for `name`, silently replacing any active session.
    ///
    /// `on_change` runs once per commit (including clearing) and never on
    /// cancel. Dropping the returned handle cancels the session if it is
    /// still active.
    pub fn start_recording(
        &self,
        name: &Name,
        scope: Scope,
        on_change: impl Fn(Option<Shortcut>) + Send + Sync + 'static,
    ) -> RecordingSession {
        let mut shared = self.inner.lock();
        shared.expire_idle_session();
        // Look up without declaring: a cancelled session leaves the registry as it was.
        let name_for_session = shared
            .registry
            .declared(name.id())
            .cloned()
            .unwrap_or_else(|| name.clone());
        let bound = shared.registry.peek(&name_for_session);
        let (id, superseded) =
            shared
                .recorder
                .start(name_for_session, scope, bound, Arc::new(on_change));
        if let Some(previous) = superseded {
            shared.retire(previous);
        }
        shared.refresh_hook();
        info!(name = %name, scope = %scope, "Recording started");
        RecordingSession {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn cancel_recording(&self) -> bool {
        self.inner.cancel_session(None, "cancelled by caller")
    }

    /// The recorder control lost focus.
    pub fn focus_lost(&self) -> bool {
        self.inner.cancel_session(None, "focus lost")
    }

    /// State of the active session, `Idle` when none.
    pub fn recorder_state(&self) -> RecorderState {
        let mut shared = self.inner.lock();
        shared.expire_idle_session();
        shared.recorder.state()
    }

    pub fn recording_snapshot(&self) -> Option<RecordingSnapshot> {
        let mut shared = self.inner.lock();
        shared.expire_idle_session();
        shared.recorder.snapshot()
    }

    /// Commit the pending conflicting candidate, unbinding the other Name.
    pub fn confirm_override(&self) -> Result<CommitReport> {
        let pending = {
            let mut shared = self.inner.lock();
            shared.expire_idle_session();
            let (id, pending) = shared
                .recorder
                .active()
                .and_then(|s| s.pending_override().map(|p| (s.id(), p.clone())))
                .ok_or(ShortcutError::NoPendingOverride)?;
            // Only unbind the other Name if it still holds the shortcut.
            let unbind = (shared.registry.current(&pending.other) == Some(pending.shortcut))
                .then_some(pending.other);
            Self::begin_commit(&mut shared, id, Some(pending.shortcut), unbind)
        };
        pending
            .map(|p| self.finish_commit(p))
            .ok_or(ShortcutError::NoPendingOverride)
    }

    pub fn decline_override(&self) -> Result<()> {
        let mut shared = self.inner.lock();
        shared.expire_idle_session();
        match shared.recorder.active_mut().map(|s| s.decline_override()) {
            Some(true) => Ok(()),
            _ => Err(ShortcutError::NoPendingOverride),
        }
    }

    /// Classified rejection stream for UI presentation.
    pub fn rejections(&self) -> async_channel::Receiver<RejectionNotice> {
        self.inner.rejections_rx.clone()
    }

    fn feed_recorder(&self, id: SessionId, event: &KeyEvent) -> RecorderOutcome {
        match RecorderInput::classify(event) {
            RecorderInput::Ignore => RecorderOutcome::Ignored,
            RecorderInput::Modifiers(modifiers) => {
                let mut shared = self.inner.lock();
                match shared.recorder.active_mut().filter(|s| s.id() == id) {
                    Some(session) => {
                        session.update_modifiers(modifiers);
                        RecorderOutcome::Updated
                    }
                    None => RecorderOutcome::Superseded,
                }
            }
            RecorderInput::Cancel => {
                if self.inner.cancel_session(Some(id), "cancel key") {
                    RecorderOutcome::Cancelled
                } else {
                    RecorderOutcome::Superseded
                }
            }
            RecorderInput::Clear => {
                let pending = {
                    let mut shared = self.inner.lock();
                    Self::begin_commit(&mut shared, id, None, None)
                };
                match pending {
                    Some(pending) => RecorderOutcome::Committed(self.finish_commit(pending)),
                    None => RecorderOutcome::Superseded,
                }
            }
            RecorderInput::Candidate(candidate) => self.record_candidate(id, candidate),
        }
    }

    fn record_candidate(&self, id: SessionId, candidate: Shortcut) -> RecorderOutcome {
        {
            let mut shared = self.inner.lock();
            match shared.recorder.active_mut().filter(|s| s.id() == id) {
                Some(session) => session.begin_candidate(candidate),
                None => return RecorderOutcome::Superseded,
            }
        }

        let reserved = self.inner.catalog.snapshot();

        let mut shared = self.inner.lock();
        let Some(name) = shared
            .recorder
            .active()
            .filter(|s| s.id() == id)
            .map(|s| s.name().clone())
        else {
            return RecorderOutcome::Superseded;
        };

        let verdict = validate_candidate(&candidate, &reserved, |s| {
            shared.registry.bound_elsewhere(s, &name)
        });
        match verdict {
            Ok(()) => {
                let pending = Self::begin_commit(&mut shared, id, Some(candidate), None);
                drop(shared);
                match pending {
                    Some(pending) => RecorderOutcome::Committed(self.finish_commit(pending)),
                    None => RecorderOutcome::Superseded,
                }
            }
            Err(rejection) => {
                if let Some(session) = shared.recorder.active_mut() {
                    session.reject(rejection.clone());
                }
                drop(shared);
                self.notify_rejection(name, candidate, rejection.clone());
                RecorderOutcome::Rejected(rejection)
            }
        }
    }

    /// Apply a commit to memory. Persisting and `on_change` follow outside
    /// the lock in [`Self::finish_commit`].
    fn begin_commit(
        shared: &mut Shared,
        id: SessionId,
        value: Option<Shortcut>,
        unbind: Option<Name>,
    ) -> Option<PendingCommit> {
        if !shared.recorder.is_active(id) {
            return None;
        }
        let committed = shared.recorder.take()?.commit(value);
        if let Some(other) = &unbind {
            shared.registry.set(other, None);
            info!(name = %other, "Unbound by override");
        }
        shared.registry.set(&committed.name, value);
        shared.refresh_hook();
        Some(PendingCommit {
            committed,
            unbound: unbind,
        })
    }

    fn finish_commit(&self, pending: PendingCommit) -> CommitReport {
        let PendingCommit { committed, unbound } = pending;
        let mut changes = Vec::with_capacity(2);
        if let Some(other) = &unbound {
            changes.push((other.clone(), None));
        }
        changes.push((committed.name.clone(), committed.value));
        let durability = self.persist(&changes);

        // Store first, then observers.
        (committed.on_change)(committed.value);

        CommitReport {
            name: committed.name,
            shortcut: committed.value,
            previous: committed.previous,
            unbound,
            durability,
        }
    }

    fn notify_rejection(&self, name: Name, shortcut: Shortcut, reason: Rejection) {
        let notice = RejectionNotice {
            name,
            shortcut,
            reason,
        };
        if let Err(e) = self.inner.rejections_tx.try_send(notice) {
            debug!(error = %e, "Rejection notice dropped");
        }
    }

    // =========================================================================
    // Diagnostics and test support
    // =========================================================================

    pub fn hook_installed(&self) -> bool {
        self.inner.lock().hook.is_installed()
    }

    /// Forget every declaration, cached binding, listener and session. The
    /// store is left alone.
    pub fn reset_for_testing(&self) {
        let mut shared = self.inner.lock();
        shared.registry.clear();
        for handler in shared.dispatch.clear() {
            shared.retire(handler);
        }
        if let Some(session) = shared.recorder.clear() {
            shared.retire(session);
        }
        shared.refresh_hook();
    }
}

/// Handle for one recording session, owned by the recorder UI.
///
/// Dropping it cancels the session silently if it is still the active one,
/// so tearing down the UI is always observable.
pub struct RecordingSession {
    id: SessionId,
    inner: Weak<Inner>,
}

impl RecordingSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.lock().recorder.is_active(self.id))
    }

    /// Cancel if still active. Returns false if it already ended.
    pub fn cancel(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.cancel_session(Some(self.id), "cancelled by caller"))
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel_session(Some(self.id), "recorder torn down");
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
