//! Virtual key codes, canonical key names and display glyphs.
//!
//! Key codes follow the macOS virtual key-code numbering (`kVK_*`), which is
//! also what the OS hook reports. Every other platform adapter translates into
//! this numbering before events reach the shortcut system.

use std::fmt;

/// What kind of key a code refers to.
///
/// Function and media keys may be bound without modifiers; everything else
/// needs at least one modifier to form a valid shortcut.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Letters, digits and punctuation.
    Printable,
    /// Return, Tab, Space, arrows, navigation keys.
    Named,
    /// F1 through F20.
    Function,
    /// Volume and mute keys.
    Media,
    /// Command, Shift, Option, Control, Caps Lock and Fn themselves.
    Modifier,
}

struct KeySpec {
    code: u16,
    name: &'static str,
    glyph: &'static str,
    kind: KeyKind,
}

const fn printable(code: u16, name: &'static str, glyph: &'static str) -> KeySpec {
    KeySpec {
        code,
        name,
        glyph,
        kind: KeyKind::Printable,
    }
}

const fn named(code: u16, name: &'static str, glyph: &'static str) -> KeySpec {
    KeySpec {
        code,
        name,
        glyph,
        kind: KeyKind::Named,
    }
}

const fn function(code: u16, name: &'static str, glyph: &'static str) -> KeySpec {
    KeySpec {
        code,
        name,
        glyph,
        kind: KeyKind::Function,
    }
}

const fn media(code: u16, name: &'static str, glyph: &'static str) -> KeySpec {
    KeySpec {
        code,
        name,
        glyph,
        kind: KeyKind::Media,
    }
}

const fn modifier(code: u16, name: &'static str, glyph: &'static str) -> KeySpec {
    KeySpec {
        code,
        name,
        glyph,
        kind: KeyKind::Modifier,
    }
}

static KEY_TABLE: &[KeySpec] = &[
    printable(0, "a", "A"),
    printable(1, "s", "S"),
    printable(2, "d", "D"),
    printable(3, "f", "F"),
    printable(4, "h", "H"),
    printable(5, "g", "G"),
    printable(6, "z", "Z"),
    printable(7, "x", "X"),
    printable(8, "c", "C"),
    printable(9, "v", "V"),
    printable(11, "b", "B"),
    printable(12, "q", "Q"),
    printable(13, "w", "W"),
    printable(14, "e", "E"),
    printable(15, "r", "R"),
    printable(16, "y", "Y"),
    printable(17, "t", "T"),
    printable(18, "1", "1"),
    printable(19, "2", "2"),
    printable(20, "3", "3"),
    printable(21, "4", "4"),
    printable(22, "6", "6"),
    printable(23, "5", "5"),
    printable(24, "equal", "="),
    printable(25, "9", "9"),
    printable(26, "7", "7"),
    printable(27, "minus", "-"),
    printable(28, "8", "8"),
    printable(29, "0", "0"),
    printable(30, "bracketright", "]"),
    printable(31, "o", "O"),
    printable(32, "u", "U"),
    printable(33, "bracketleft", "["),
    printable(34, "i", "I"),
    printable(35, "p", "P"),
    named(36, "enter", "↵"),
    printable(37, "l", "L"),
    printable(38, "j", "J"),
    printable(39, "quote", "'"),
    printable(40, "k", "K"),
    printable(41, "semicolon", ";"),
    printable(42, "backslash", "\\"),
    printable(43, "comma", ","),
    printable(44, "slash", "/"),
    printable(45, "n", "N"),
    printable(46, "m", "M"),
    printable(47, "period", "."),
    named(48, "tab", "⇥"),
    named(49, "space", "␣"),
    printable(50, "backquote", "`"),
    named(51, "backspace", "⌫"),
    named(53, "escape", "⎋"),
    modifier(54, "rightcommand", "⌘"),
    modifier(55, "leftcommand", "⌘"),
    modifier(56, "leftshift", "⇧"),
    modifier(57, "capslock", "⇪"),
    modifier(58, "leftoption", "⌥"),
    modifier(59, "leftcontrol", "⌃"),
    modifier(60, "rightshift", "⇧"),
    modifier(61, "rightoption", "⌥"),
    modifier(62, "rightcontrol", "⌃"),
    modifier(63, "fnkey", "fn"),
    function(64, "f17", "F17"),
    media(72, "volumeup", "🔊"),
    media(73, "volumedown", "🔉"),
    media(74, "mute", "🔇"),
    function(79, "f18", "F18"),
    function(80, "f19", "F19"),
    function(90, "f20", "F20"),
    function(96, "f5", "F5"),
    function(97, "f6", "F6"),
    function(98, "f7", "F7"),
    function(99, "f3", "F3"),
    function(100, "f8", "F8"),
    function(101, "f9", "F9"),
    function(103, "f11", "F11"),
    function(105, "f13", "F13"),
    function(106, "f16", "F16"),
    function(107, "f14", "F14"),
    function(109, "f10", "F10"),
    function(111, "f12", "F12"),
    function(113, "f15", "F15"),
    named(114, "help", "?⃝"),
    named(115, "home", "↖"),
    named(116, "pageup", "⇞"),
    named(117, "delete", "⌦"),
    function(118, "f4", "F4"),
    named(119, "end", "↘"),
    function(120, "f2", "F2"),
    named(121, "pagedown", "⇟"),
    function(122, "f1", "F1"),
    named(123, "left", "←"),
    named(124, "right", "→"),
    named(125, "down", "↓"),
    named(126, "up", "↑"),
];

/// A physical key identified by its virtual key code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u16);

impl Key {
    pub const A: Key = Key(0);
    pub const K: Key = Key(40);
    pub const SPACE: Key = Key(49);
    pub const TAB: Key = Key(48);
    pub const ENTER: Key = Key(36);
    pub const BACKSPACE: Key = Key(51);
    pub const DELETE: Key = Key(117);
    pub const ESCAPE: Key = Key(53);
    pub const F1: Key = Key(122);

    pub const fn from_code(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(self) -> u16 {
        self.0
    }

    /// Look a key up by name, accepting the aliases `canonicalize_key` knows.
    pub fn from_name(name: &str) -> Option<Self> {
        let canonical = canonicalize_key(name);
        KEY_TABLE
            .iter()
            .find(|spec| spec.name == canonical)
            .map(|spec| Self(spec.code))
    }

    fn spec(self) -> Option<&'static KeySpec> {
        KEY_TABLE.iter().find(|spec| spec.code == self.0)
    }

    /// Canonical lowercase name, `None` for codes outside the table.
    pub fn name(self) -> Option<&'static str> {
        self.spec().map(|spec| spec.name)
    }

    /// Unknown codes are treated as printable so they always need a modifier.
    pub fn kind(self) -> KeyKind {
        self.spec().map_or(KeyKind::Printable, |spec| spec.kind)
    }

    pub fn is_known(self) -> bool {
        self.spec().is_some()
    }

    /// A modifier key pressed on its own, never part of a shortcut.
    pub fn is_modifier(self) -> bool {
        self.kind() == KeyKind::Modifier
    }

    /// Keys that may form a shortcut without any modifier.
    pub fn allowed_standalone(self) -> bool {
        matches!(self.kind(), KeyKind::Function | KeyKind::Media)
    }

    /// Symbolic rendering (`K`, `↵`, `F5`).
    pub fn glyph(self) -> String {
        match self.spec() {
            Some(spec) => spec.glyph.to_string(),
            None => format!("<{}>", self.0),
        }
    }

    /// Word rendering for platforms without glyph conventions (`Enter`, `PageUp`).
    pub fn text(self) -> String {
        let Some(spec) = self.spec() else {
            return format!("Key{}", self.0);
        };
        match spec.name {
            "enter" => "Enter",
            "escape" => "Esc",
            "tab" => "Tab",
            "space" => "Space",
            "backspace" => "Backspace",
            "delete" => "Delete",
            "up" => "Up",
            "down" => "Down",
            "left" => "Left",
            "right" => "Right",
            "home" => "Home",
            "end" => "End",
            "pageup" => "PageUp",
            "pagedown" => "PageDown",
            "help" => "Help",
            "volumeup" => "VolumeUp",
            "volumedown" => "VolumeDown",
            "mute" => "Mute",
            _ => return spec.glyph.to_string(),
        }
        .to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.glyph())
    }
}

/// Canonicalize a key name to the internal standard form.
pub fn canonicalize_key(key: &str) -> String {
    let key_lower = key.to_lowercase();
    match key_lower.as_str() {
        "arrowup" | "uparrow" => "up",
        "arrowdown" | "downarrow" => "down",
        "arrowleft" | "leftarrow" => "left",
        "arrowright" | "rightarrow" => "right",
        "return" => "enter",
        "esc" => "escape",
        "back" => "backspace",
        "del" | "forwarddelete" => "delete",
        "/" | "forwardslash" => "slash",
        "\\" => "backslash",
        ";" => "semicolon",
        "'" | "apostrophe" => "quote",
        "," => "comma",
        "." | "dot" => "period",
        "[" | "leftbracket" => "bracketleft",
        "]" | "rightbracket" => "bracketright",
        "-" | "dash" | "hyphen" => "minus",
        "=" | "equals" => "equal",
        "`" | "backtick" | "grave" => "backquote",
        "pgup" => "pageup",
        "pgdn" | "pgdown" => "pagedown",
        "volume_up" | "audiovolumeup" => "volumeup",
        "volume_down" | "audiovolumedown" => "volumedown",
        "audiovolumemute" | "volumemute" => "mute",
        _ => return key_lower,
    }
    .to_string()
}
