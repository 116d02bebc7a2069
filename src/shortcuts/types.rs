//! Core shortcut types with proper error handling and platform-aware display.
//!
//! This module provides:
//! - `Shortcut` - A keyboard shortcut (key code + modifiers)
//! - `Modifiers` - Modifier key bitset (command, option, control, shift, function)
//! - `ShortcutParseError` - Detailed parse errors for user feedback
//! - Flat encoding for storage (`encode` / `decode`)
//! - Platform-aware display (⌘⇧K on macOS, Ctrl+Shift+K on Windows/Linux)

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::key::Key;
use crate::error::ShortcutError;

/// Errors that can occur when parsing a shortcut string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcutParseError {
    #[error("shortcut string is empty")]
    Empty,
    #[error("shortcut has no key, only modifiers")]
    MissingKey,
    #[error("unknown token '{0}' in shortcut")]
    UnknownToken(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

bitflags! {
    /// Modifier key flags for a shortcut.
    ///
    /// The bit values are part of the stored encoding and must not change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Modifiers: u8 {
        /// Command key (⌘), Super/Win elsewhere
        const COMMAND = 1 << 0;
        /// Option key (⌥), Alt elsewhere
        const OPTION = 1 << 1;
        /// Control key (⌃)
        const CONTROL = 1 << 2;
        /// Shift key (⇧)
        const SHIFT = 1 << 3;
        /// Function key (fn / 🌐)
        const FUNCTION = 1 << 4;
    }
}

impl Modifiers {
    pub fn any(&self) -> bool {
        !self.is_empty()
    }

    /// Shift alone does not turn a printable key into a shortcut (it just types
    /// the uppercase character).
    pub fn is_shift_only(&self) -> bool {
        *self == Modifiers::SHIFT
    }

    /// Modifier glyphs in the standard macOS order.
    pub fn glyphs(&self) -> String {
        let mut s = String::new();
        if self.contains(Self::CONTROL) {
            s.push('⌃');
        }
        if self.contains(Self::OPTION) {
            s.push('⌥');
        }
        if self.contains(Self::SHIFT) {
            s.push('⇧');
        }
        if self.contains(Self::COMMAND) {
            s.push('⌘');
        }
        if self.contains(Self::FUNCTION) {
            s.push('🌐');
        }
        s
    }
}

/// Platform enum for display formatting and the reserved-combination table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "mac")]
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        #[cfg(target_os = "macos")]
        {
            Platform::MacOS
        }
        #[cfg(target_os = "windows")]
        {
            Platform::Windows
        }
        #[cfg(target_os = "linux")]
        {
            Platform::Linux
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            Platform::Linux
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// Flat storage layout: `{"keyCode":40,"modifiers":9}`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EncodedShortcut {
    key_code: u16,
    modifiers: u8,
}

/// A keyboard shortcut consisting of a key and modifier keys.
///
/// Two shortcuts are equal iff key code and modifiers are identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Shortcut {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl Shortcut {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn from_code(key_code: u16, modifiers: Modifiers) -> Self {
        Self::new(Key::from_code(key_code), modifiers)
    }

    pub fn parse(s: &str) -> Result<Self, ShortcutParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let normalized = s.replace('+', " ");
        let parts: Vec<&str> = normalized.split_whitespace().collect();
        if parts.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let mut modifiers = Modifiers::empty();
        let mut key_part: Option<&str> = None;

        for part in &parts {
            let part_lower = part.to_lowercase();
            match part_lower.as_str() {
                "cmd" | "command" | "meta" | "super" | "win" | "⌘" => {
                    modifiers |= Modifiers::COMMAND
                }
                "ctrl" | "control" | "ctl" | "^" | "⌃" => modifiers |= Modifiers::CONTROL,
                "alt" | "opt" | "option" | "⌥" => modifiers |= Modifiers::OPTION,
                "shift" | "shft" | "⇧" => modifiers |= Modifiers::SHIFT,
                "fn" | "function" | "🌐" => modifiers |= Modifiers::FUNCTION,
                _ => {
                    if key_part.is_some() {
                        return Err(ShortcutParseError::UnknownToken(part.to_string()));
                    }
                    key_part = Some(part);
                }
            }
        }

        let key_name = key_part.ok_or(ShortcutParseError::MissingKey)?;
        let key = Key::from_name(key_name)
            .ok_or_else(|| ShortcutParseError::UnknownKey(key_name.to_string()))?;

        Ok(Self { key, modifiers })
    }

    /// Whether this combination may be bound at all.
    ///
    /// Printable and named keys need at least one modifier other than shift;
    /// function and media keys may stand alone.
    pub fn is_valid(&self) -> bool {
        if self.key.is_modifier() {
            return false;
        }
        if self.key.allowed_standalone() {
            return true;
        }
        self.modifiers.any() && !self.modifiers.is_shift_only()
    }

    /// Encode for the persistence store.
    pub fn encode(&self) -> String {
        let encoded = EncodedShortcut {
            key_code: self.key.code(),
            modifiers: self.modifiers.bits(),
        };
        // Serializing two integers cannot fail.
        serde_json::to_string(&encoded).unwrap_or_default()
    }

    /// Decode a stored value produced by [`Shortcut::encode`].
    pub fn decode(raw: &str) -> Result<Self, ShortcutError> {
        let encoded: EncodedShortcut = serde_json::from_str(raw)
            .map_err(|e| ShortcutError::MalformedEncoding(format!("{raw}: {e}")))?;
        let modifiers = Modifiers::from_bits(encoded.modifiers).ok_or_else(|| {
            ShortcutError::MalformedEncoding(format!(
                "{raw}: unknown modifier bits {:#x}",
                encoded.modifiers
            ))
        })?;
        Ok(Self::from_code(encoded.key_code, modifiers))
    }

    /// Human-readable rendering in the current platform's convention.
    pub fn description(&self) -> String {
        self.description_for_platform(Platform::current())
    }

    pub fn description_for_platform(&self, platform: Platform) -> String {
        match platform {
            Platform::MacOS => self.display_macos(),
            Platform::Windows | Platform::Linux => self.display_other(),
        }
    }

    fn display_macos(&self) -> String {
        let mut s = self.modifiers.glyphs();
        s.push_str(&self.key.glyph());
        s
    }

    fn display_other(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.modifiers.contains(Modifiers::CONTROL) {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.contains(Modifiers::OPTION) {
            parts.push("Alt".to_string());
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            parts.push("Shift".to_string());
        }
        if self.modifiers.contains(Modifiers::COMMAND) {
            parts.push("Super".to_string());
        }
        if self.modifiers.contains(Modifiers::FUNCTION) {
            parts.push("Fn".to_string());
        }
        parts.push(self.key.text());
        parts.join("+")
    }

    /// Stable config-style string, e.g. `cmd+shift+k`.
    pub fn to_canonical_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.modifiers.contains(Modifiers::OPTION) {
            parts.push("alt".to_string());
        }
        if self.modifiers.contains(Modifiers::COMMAND) {
            parts.push("cmd".to_string());
        }
        if self.modifiers.contains(Modifiers::CONTROL) {
            parts.push("ctrl".to_string());
        }
        if self.modifiers.contains(Modifiers::FUNCTION) {
            parts.push("fn".to_string());
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            parts.push("shift".to_string());
        }
        match self.key.name() {
            Some(name) => parts.push(name.to_string()),
            None => parts.push(format!("key{}", self.key.code())),
        }
        parts.join("+")
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
