//! Shortcut Kit - named, user-configurable keyboard shortcuts
//!
//! This library lets an application declare shortcut Names, record bindings
//! through a validating state machine, persist them, and dispatch key events
//! to local or global listeners.

pub mod config;
pub mod error;
pub mod hotkeys;
pub mod logging;
pub mod shortcuts;
