//! Named, user-configurable keyboard shortcuts.
//!
//! This module provides:
//! - `Shortcut` / `Key` / `Modifiers` value types with encode/decode and display
//! - `Name` identifiers with declared defaults
//! - A lazily loaded registry over a persistence store
//! - A reserved-combination catalog (static OS table + live menu provider)
//! - A recording state machine with validation and override confirmation
//! - Local/global listener dispatch with scoped handles
//!
//! # Architecture
//!
//! [`ShortcutManager`] owns everything mutable behind one lock. Raw key events
//! enter through [`ShortcutManager::handle_key_event`]; while a recording
//! session is active they go to the recorder, otherwise they are resolved to
//! Names through the registry and fanned out to listeners.
//!
//! # Example
//!
//! ```ignore
//! use shortcut_kit::shortcuts::{Name, Scope, Shortcut, ShortcutManager};
//!
//! let manager = ShortcutManager::in_memory();
//! let toggle = manager.declare(&Name::with_default("toggle", Shortcut::parse("cmd+shift+k")?));
//! let _handle = manager.register(&toggle, Scope::Global, || println!("toggled"));
//! let _session = manager.start_recording(&toggle, Scope::Local, |new| println!("{new:?}"));
//! ```

mod dispatch;
mod key;
mod manager;
mod name;
pub mod persistence;
mod recorder;
mod registry;
pub mod reserved;
mod types;

pub use key::{canonicalize_key, Key, KeyKind};
pub use types::{Modifiers, Platform, Shortcut, ShortcutParseError};

pub use name::Name;

pub use persistence::{
    default_store_path, JsonFileBackend, MemoryBackend, ShortcutStore, StoreBackend, StoreError,
    StoredEntry,
};

pub use registry::NameRegistry;

pub use reserved::{
    MenuItem, NoMenus, ReservedCatalog, ReservedCatalogProvider, ReservedEntry, ReservedSnapshot,
    ReservedSource,
};

pub use recorder::{
    validate_candidate, OnChange, PendingOverride, RecorderInput, RecorderState,
    RecordingSnapshot, Rejection, SessionId,
};

pub use dispatch::{DispatchTable, DispatchTarget, ListenerHandle, ListenerId, Scope};

pub use manager::{
    CommitReport, Durability, KeyEventOutcome, RecorderOutcome, RecordingSession,
    RejectionNotice, ShortcutManager, ShortcutManagerBuilder,
};
