//! Recording state machine.
//!
//! ```text
//! Idle → Listening → Recording → Validating → Committed → Idle
//!                                          └→ Rejected → Listening
//! Listening/Recording → Cancelled → Idle
//! ```
//!
//! This module is pure state: it never touches the store, the registry or the
//! reserved catalog provider. [`crate::shortcuts::ShortcutManager`] drives it
//! and does the I/O around each transition.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::dispatch::Scope;
use super::key::Key;
use super::name::Name;
use super::reserved::{ReservedEntry, ReservedSnapshot, ReservedSource};
use super::types::{Modifiers, Shortcut};
use crate::error::ShortcutError;
use crate::hotkeys::{KeyEvent, KeyPhase};

/// Invoked exactly once per commit, with the new value (`None` when cleared).
pub type OnChange = Arc<dyn Fn(Option<Shortcut>) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Listening,
    Recording,
    Validating,
    Committed,
    Rejected,
    Cancelled,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecorderState::Idle => "idle",
            RecorderState::Listening => "listening",
            RecorderState::Recording => "recording",
            RecorderState::Validating => "validating",
            RecorderState::Committed => "committed",
            RecorderState::Rejected => "rejected",
            RecorderState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why a candidate was not committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    InvalidCombination,
    ReservedBySystem { label: String },
    ReservedByMenu { title: String },
    /// Bound to another Name. Recoverable through an explicit override.
    ConflictsWithName(Name),
}

impl From<ReservedEntry> for Rejection {
    fn from(entry: ReservedEntry) -> Self {
        match entry.source {
            ReservedSource::System { label } => Rejection::ReservedBySystem { label },
            ReservedSource::Menu { title } => Rejection::ReservedByMenu { title },
        }
    }
}

impl From<Rejection> for ShortcutError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::InvalidCombination => ShortcutError::InvalidCombination,
            Rejection::ReservedBySystem { label } => ShortcutError::ReservedBySystem { label },
            Rejection::ReservedByMenu { title } => ShortcutError::ReservedByMenu { title },
            Rejection::ConflictsWithName(name) => ShortcutError::ConflictsWithName(name),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ShortcutError::from(self.clone()))
    }
}

/// Check a candidate for `name`, in order: invariant, reserved, conflict.
///
/// `bound_elsewhere` returns the other Name currently holding the candidate.
pub fn validate_candidate(
    candidate: &Shortcut,
    reserved: &ReservedSnapshot,
    bound_elsewhere: impl FnOnce(&Shortcut) -> Option<Name>,
) -> Result<(), Rejection> {
    if !candidate.is_valid() {
        return Err(Rejection::InvalidCombination);
    }
    if let Some(entry) = reserved.is_reserved(candidate) {
        return Err(entry.into());
    }
    if let Some(other) = bound_elsewhere(candidate) {
        return Err(Rejection::ConflictsWithName(other));
    }
    Ok(())
}

/// What a raw key event means to an active session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderInput {
    /// Modifier state changed; live display only.
    Modifiers(Modifiers),
    /// Escape, or Tab moving focus away.
    Cancel,
    /// Backspace/Delete: commit "no shortcut".
    Clear,
    Candidate(Shortcut),
    Ignore,
}

impl RecorderInput {
    pub fn classify(event: &KeyEvent) -> Self {
        let key = Key::from_code(event.key_code);
        // Some sources report modifier keys as plain down/up events.
        if event.phase == KeyPhase::FlagsChanged || key.is_modifier() {
            return RecorderInput::Modifiers(event.modifiers);
        }
        match event.phase {
            KeyPhase::Up => return RecorderInput::Ignore,
            KeyPhase::Down if event.is_repeat => return RecorderInput::Ignore,
            _ => {}
        }
        if event.modifiers.is_empty() {
            if key == Key::ESCAPE || key == Key::TAB {
                return RecorderInput::Cancel;
            }
            if key == Key::BACKSPACE || key == Key::DELETE {
                return RecorderInput::Clear;
            }
        }
        RecorderInput::Candidate(Shortcut::new(key, event.modifiers))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

/// A conflicting candidate waiting for the caller to confirm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingOverride {
    pub shortcut: Shortcut,
    pub other: Name,
}

/// Read-only view of the active session for UI binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordingSnapshot {
    pub name: Name,
    pub scope: Scope,
    pub state: RecorderState,
    pub live_modifiers: Modifiers,
    pub candidate: Option<Shortcut>,
    pub bound: Option<Shortcut>,
    pub pending_override: Option<PendingOverride>,
    pub last_rejection: Option<Rejection>,
}

impl RecordingSnapshot {
    /// Text a recorder control shows right now.
    pub fn display(&self) -> String {
        if let Some(candidate) = self.candidate {
            return candidate.description();
        }
        if self.live_modifiers.any() {
            return self.live_modifiers.glyphs();
        }
        self.bound.map(|s| s.description()).unwrap_or_default()
    }
}

/// The one in-progress recording.
pub struct Session {
    id: SessionId,
    name: Name,
    scope: Scope,
    state: RecorderState,
    live_modifiers: Modifiers,
    candidate: Option<Shortcut>,
    bound: Option<Shortcut>,
    pending_override: Option<PendingOverride>,
    last_rejection: Option<Rejection>,
    on_change: OnChange,
    last_activity: Instant,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn pending_override(&self) -> Option<&PendingOverride> {
        self.pending_override.as_ref()
    }

    /// Keep the displayed bound value in sync with direct API writes.
    pub fn set_bound(&mut self, bound: Option<Shortcut>) {
        self.bound = bound;
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn transition(&mut self, to: RecorderState) {
        debug!(name = %self.name, from = %self.state, to = %to, "Recorder transition");
        self.state = to;
    }

    pub fn update_modifiers(&mut self, modifiers: Modifiers) {
        self.touch();
        self.live_modifiers = modifiers;
    }

    /// A qualifying key-down arrived. Any pending override is discarded.
    pub fn begin_candidate(&mut self, candidate: Shortcut) {
        self.touch();
        self.pending_override = None;
        self.last_rejection = None;
        self.candidate = Some(candidate);
        self.transition(RecorderState::Recording);
        self.transition(RecorderState::Validating);
    }

    /// Report a rejection and go back to listening for another try.
    pub fn reject(&mut self, rejection: Rejection) {
        self.transition(RecorderState::Rejected);
        if let (Rejection::ConflictsWithName(other), Some(shortcut)) =
            (&rejection, self.candidate)
        {
            self.pending_override = Some(PendingOverride {
                shortcut,
                other: other.clone(),
            });
        }
        info!(name = %self.name, reason = %rejection, "Recorder rejected candidate");
        self.candidate = None;
        self.last_rejection = Some(rejection);
        self.transition(RecorderState::Listening);
    }

    pub fn decline_override(&mut self) -> bool {
        self.touch();
        self.pending_override.take().is_some()
    }

    /// Finish with `value`. The session is consumed.
    pub fn commit(mut self, value: Option<Shortcut>) -> CommittedSession {
        self.transition(RecorderState::Committed);
        info!(
            name = %self.name,
            shortcut = ?value.map(|s| s.to_canonical_string()),
            "Recorder committed"
        );
        CommittedSession {
            name: self.name,
            previous: self.bound,
            value,
            on_change: self.on_change,
        }
    }

    pub fn snapshot(&self) -> RecordingSnapshot {
        RecordingSnapshot {
            name: self.name.clone(),
            scope: self.scope,
            state: self.state,
            live_modifiers: self.live_modifiers,
            candidate: self.candidate,
            bound: self.bound,
            pending_override: self.pending_override.clone(),
            last_rejection: self.last_rejection.clone(),
        }
    }
}

/// Result of a commit, for the caller to persist and announce.
pub struct CommittedSession {
    pub name: Name,
    pub previous: Option<Shortcut>,
    pub value: Option<Shortcut>,
    pub on_change: OnChange,
}

/// Owned, swappable slot for the single active session.
#[derive(Default)]
pub struct Recorder {
    slot: Option<Session>,
    next_id: u64,
    idle_timeout: Option<Duration>,
}

impl Recorder {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            slot: None,
            next_id: 0,
            idle_timeout,
        }
    }

    /// Start listening for `name`. A session already in the slot is handed
    /// back without calling its `on_change`.
    ///
    /// Removed sessions are returned rather than dropped here: their
    /// `on_change` may own handles that lock the manager on drop, so the
    /// caller drops them once its own lock is released.
    pub fn start(
        &mut self,
        name: Name,
        scope: Scope,
        bound: Option<Shortcut>,
        on_change: OnChange,
    ) -> (SessionId, Option<Session>) {
        let superseded = self.slot.take();
        if let Some(previous) = &superseded {
            info!(name = %previous.name, "Recording superseded by a new session");
        }
        self.next_id += 1;
        let id = SessionId(self.next_id);
        let mut session = Session {
            id,
            name,
            scope,
            state: RecorderState::Idle,
            live_modifiers: Modifiers::empty(),
            candidate: None,
            bound,
            pending_override: None,
            last_rejection: None,
            on_change,
            last_activity: Instant::now(),
        };
        session.transition(RecorderState::Listening);
        self.slot = Some(session);
        (id, superseded)
    }

    pub fn active(&self) -> Option<&Session> {
        self.slot.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        self.slot.as_mut()
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.slot.as_ref().is_some_and(|s| s.id == id)
    }

    pub fn state(&self) -> RecorderState {
        self.slot
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(RecorderState::Idle)
    }

    /// Remove the active session for commit.
    pub fn take(&mut self) -> Option<Session> {
        self.slot.take()
    }

    /// Cancel silently. With `id`, only if that session is still active.
    ///
    /// Returns the cancelled session for the caller to drop.
    pub fn cancel(&mut self, id: Option<SessionId>, reason: &str) -> Option<Session> {
        let matches = match (id, &self.slot) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(id), Some(session)) => session.id == id,
        };
        if !matches {
            return None;
        }
        let mut session = self.slot.take()?;
        session.transition(RecorderState::Cancelled);
        info!(name = %session.name, reason = reason, "Recording cancelled");
        Some(session)
    }

    /// Cancel the active session if it has been idle past the timeout.
    pub fn expire_idle(&mut self, now: Instant) -> Option<Session> {
        let timeout = self.idle_timeout?;
        let expired = self
            .slot
            .as_ref()
            .is_some_and(|s| now.saturating_duration_since(s.last_activity) > timeout);
        if expired {
            self.cancel(None, "idle timeout")
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> Option<RecordingSnapshot> {
        self.slot.as_ref().map(Session::snapshot)
    }

    pub fn clear(&mut self) -> Option<Session> {
        self.slot.take()
    }
}
