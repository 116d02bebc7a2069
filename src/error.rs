use thiserror::Error;
use tracing::{error, warn};

use crate::shortcuts::{Name, ShortcutParseError};

/// Error severity for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,    // Nothing went wrong, the user picked something unusable
    Warning, // Recovered internally, durability or data degraded
    Error,   // Operation failed
}

/// Domain-specific errors for the shortcut system.
///
/// The four rejection kinds (`InvalidCombination`, `ReservedBySystem`,
/// `ReservedByMenu`, `ConflictsWithName`) are reported to the recorder's caller.
/// `MalformedEncoding` and `StoreUnavailable` are recovered internally and only
/// surface as diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcutError {
    #[error("combination needs at least one modifier")]
    InvalidCombination,

    #[error("combination is reserved by the system ({label})")]
    ReservedBySystem { label: String },

    #[error("combination is used by the menu item '{title}'")]
    ReservedByMenu { title: String },

    #[error("combination is already bound to '{0}'")]
    ConflictsWithName(Name),

    #[error("malformed shortcut encoding: {0}")]
    MalformedEncoding(String),

    #[error("shortcut store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid shortcut: {0}")]
    Parse(#[from] ShortcutParseError),

    #[error("key event hook unavailable: {0}")]
    HookUnavailable(String),

    #[error("no override is pending")]
    NoPendingOverride,
}

impl ShortcutError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidCombination
            | Self::ReservedBySystem { .. }
            | Self::ReservedByMenu { .. }
            | Self::ConflictsWithName(_)
            | Self::Parse(_)
            | Self::NoPendingOverride => ErrorSeverity::Info,
            Self::MalformedEncoding(_) | Self::StoreUnavailable(_) => ErrorSeverity::Warning,
            Self::HookUnavailable(_) => ErrorSeverity::Error,
        }
    }

    /// Whether the error is one of the rejection kinds a recorder reports.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidCombination
                | Self::ReservedBySystem { .. }
                | Self::ReservedByMenu { .. }
                | Self::ConflictsWithName(_)
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCombination => {
                "The shortcut must include at least one modifier key.".to_string()
            }
            Self::ReservedBySystem { label } => {
                format!("This shortcut cannot be used because it is used by the system ({label}).")
            }
            Self::ReservedByMenu { title } => {
                format!("This shortcut cannot be used because it is already used by the menu item \"{title}\".")
            }
            Self::ConflictsWithName(name) => {
                format!("This shortcut is already used by \"{name}\". Use it here instead?")
            }
            Self::MalformedEncoding(_) => "A saved shortcut could not be read.".to_string(),
            Self::StoreUnavailable(_) => {
                "The shortcut was set but could not be saved.".to_string()
            }
            Self::Parse(e) => format!("Invalid shortcut: {e}"),
            Self::HookUnavailable(msg) => format!("Global shortcuts are unavailable: {msg}"),
            Self::NoPendingOverride => "There is nothing to confirm.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShortcutError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use shortcut_kit::error::ResultExt;
///
/// // Degrade to "no shortcut" when the stored value is unreadable
/// let shortcut = Shortcut::decode(&raw).warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
