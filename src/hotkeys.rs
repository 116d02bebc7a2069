use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers as HotkeyModifiers},
    Error as HotkeyError, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ShortcutError;
use crate::logging;
use crate::shortcuts::{Modifiers, Shortcut};

/// Callback run when a registered shortcut fires.
pub type HotkeyHandler = Arc<dyn Fn() + Send + Sync>;

// =============================================================================
// Raw key events
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyPhase {
    Down,
    Up,
    /// Modifier keys changed with no other key involved.
    FlagsChanged,
}

/// A raw key event as delivered by the OS hook or the host's window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// Virtual key code (macOS numbering). Ignored for `FlagsChanged`.
    pub key_code: u16,
    pub modifiers: Modifiers,
    pub phase: KeyPhase,
    pub is_repeat: bool,
}

impl KeyEvent {
    pub fn down(key_code: u16, modifiers: Modifiers) -> Self {
        Self {
            key_code,
            modifiers,
            phase: KeyPhase::Down,
            is_repeat: false,
        }
    }

    pub fn up(key_code: u16, modifiers: Modifiers) -> Self {
        Self {
            key_code,
            modifiers,
            phase: KeyPhase::Up,
            is_repeat: false,
        }
    }

    pub fn flags_changed(modifiers: Modifiers) -> Self {
        Self {
            key_code: 0,
            modifiers,
            phase: KeyPhase::FlagsChanged,
            is_repeat: false,
        }
    }

    pub fn repeat(mut self) -> Self {
        self.is_repeat = true;
        self
    }

    pub fn shortcut(&self) -> Shortcut {
        Shortcut::from_code(self.key_code, self.modifiers)
    }
}

// =============================================================================
// Hook abstraction
// =============================================================================

/// OS-level key hook.
///
/// The manager installs it lazily, only while something needs global
/// delivery, and keeps `update_bindings` in sync with the bound global
/// shortcuts. Events the hook observes go back into
/// `ShortcutManager::handle_key_event`.
pub trait KeyEventHook: Send {
    fn install(&mut self) -> Result<(), ShortcutError>;
    fn uninstall(&mut self);
    fn is_installed(&self) -> bool;
    /// Replace the set of combinations the hook should watch.
    fn update_bindings(&mut self, bindings: &[Shortcut]);
}

/// Hook for hosts that only use local scope. Never delivers anything.
#[derive(Debug, Default)]
pub struct NoopHook {
    installed: bool,
}

impl KeyEventHook for NoopHook {
    fn install(&mut self) -> Result<(), ShortcutError> {
        self.installed = true;
        Ok(())
    }

    fn uninstall(&mut self) {
        self.installed = false;
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn update_bindings(&mut self, _bindings: &[Shortcut]) {}
}

// =============================================================================
// global-hotkey backed hook
// =============================================================================

/// Map a key to the `global-hotkey` code, by canonical key name.
fn key_code_for(shortcut: &Shortcut) -> Option<Code> {
    let code = match shortcut.key.name()? {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "f13" => Code::F13,
        "f14" => Code::F14,
        "f15" => Code::F15,
        "f16" => Code::F16,
        "f17" => Code::F17,
        "f18" => Code::F18,
        "f19" => Code::F19,
        "f20" => Code::F20,
        "space" => Code::Space,
        "enter" => Code::Enter,
        "tab" => Code::Tab,
        "escape" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" => Code::Delete,
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "help" => Code::Help,
        "minus" => Code::Minus,
        "equal" => Code::Equal,
        "bracketleft" => Code::BracketLeft,
        "bracketright" => Code::BracketRight,
        "backslash" => Code::Backslash,
        "semicolon" => Code::Semicolon,
        "quote" => Code::Quote,
        "comma" => Code::Comma,
        "period" => Code::Period,
        "slash" => Code::Slash,
        "backquote" => Code::Backquote,
        "volumeup" => Code::AudioVolumeUp,
        "volumedown" => Code::AudioVolumeDown,
        "mute" => Code::AudioVolumeMute,
        _ => return None,
    };
    Some(code)
}

fn hotkey_modifiers(modifiers: Modifiers) -> HotkeyModifiers {
    let mut mods = HotkeyModifiers::empty();
    if modifiers.contains(Modifiers::COMMAND) {
        mods |= HotkeyModifiers::META;
    }
    if modifiers.contains(Modifiers::OPTION) {
        mods |= HotkeyModifiers::ALT;
    }
    if modifiers.contains(Modifiers::CONTROL) {
        mods |= HotkeyModifiers::CONTROL;
    }
    if modifiers.contains(Modifiers::SHIFT) {
        mods |= HotkeyModifiers::SHIFT;
    }
    if modifiers.contains(Modifiers::FUNCTION) {
        mods |= HotkeyModifiers::FN;
    }
    mods
}

/// Convert a shortcut to an OS hotkey. Keys without a `global-hotkey` code
/// cannot be registered globally.
pub fn to_hotkey(shortcut: &Shortcut) -> Option<HotKey> {
    let code = key_code_for(shortcut)?;
    let mods = hotkey_modifiers(shortcut.modifiers);
    Some(HotKey::new((!mods.is_empty()).then_some(mods), code))
}

/// Format a hotkey registration error with helpful context
fn format_hotkey_error(e: &HotkeyError, shortcut_display: &str) -> String {
    match e {
        HotkeyError::AlreadyRegistered(hk) => {
            format!(
                "Hotkey '{}' is already registered by another application (ID: {}). \
                 Try a different shortcut or close the conflicting app.",
                shortcut_display,
                hk.id()
            )
        }
        HotkeyError::FailedToRegister(msg) => {
            format!(
                "System rejected hotkey '{}': {}. This shortcut may be reserved by the OS.",
                shortcut_display, msg
            )
        }
        HotkeyError::OsError(os_err) => {
            format!(
                "OS error registering '{}': {}. Check system hotkey settings.",
                shortcut_display, os_err
            )
        }
        other => format!(
            "Failed to register hotkey '{}': {}",
            shortcut_display, other
        ),
    }
}

/// [`KeyEventHook`] over the `global-hotkey` crate.
///
/// Each bound global shortcut becomes one OS hotkey. A forwarding thread
/// turns `GlobalHotKeyEvent`s into [`KeyEvent`]s on [`GlobalHotkeyHook::events`];
/// the host drains that channel into `ShortcutManager::handle_key_event`.
///
/// NOTE: on macOS the hotkey manager must be created on the main thread.
pub struct GlobalHotkeyHook {
    manager: Option<GlobalHotKeyManager>,
    /// Registered hotkeys by id; shared with the forwarding thread.
    registered: Arc<RwLock<HashMap<u32, (HotKey, Shortcut)>>>,
    events_tx: async_channel::Sender<KeyEvent>,
    events_rx: async_channel::Receiver<KeyEvent>,
    forwarder_started: bool,
}

impl GlobalHotkeyHook {
    pub fn new() -> Self {
        let (events_tx, events_rx) = async_channel::unbounded();
        Self {
            manager: None,
            registered: Arc::new(RwLock::new(HashMap::new())),
            events_tx,
            events_rx,
            forwarder_started: false,
        }
    }

    /// Receiver for events observed by the OS hook.
    pub fn events(&self) -> async_channel::Receiver<KeyEvent> {
        self.events_rx.clone()
    }

    pub fn registered_count(&self) -> usize {
        self.registered.read().len()
    }

    fn start_forwarder(&mut self) {
        if self.forwarder_started {
            return;
        }
        self.forwarder_started = true;
        let registered = self.registered.clone();
        let tx = self.events_tx.clone();
        std::thread::spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.recv() {
                let Some(shortcut) = registered.read().get(&event.id).map(|(_, s)| *s) else {
                    continue;
                };
                let key_event = match event.state {
                    HotKeyState::Pressed => KeyEvent::down(shortcut.key.code(), shortcut.modifiers),
                    HotKeyState::Released => KeyEvent::up(shortcut.key.code(), shortcut.modifiers),
                };
                logging::log_key_event(&key_event, "global hook");
                if tx.send_blocking(key_event).is_err() {
                    logging::log("HOTKEY", "Key event channel closed, stopping forwarder");
                    break;
                }
            }
        });
    }

    fn register(&self, manager: &GlobalHotKeyManager, shortcut: &Shortcut) -> anyhow::Result<()> {
        let display = shortcut.to_canonical_string();
        let hotkey = to_hotkey(shortcut)
            .ok_or_else(|| anyhow::anyhow!("No global hotkey code for '{}'", display))?;
        manager
            .register(hotkey)
            .map_err(|e| anyhow::anyhow!(format_hotkey_error(&e, &display)))?;
        self.registered
            .write()
            .insert(hotkey.id(), (hotkey, *shortcut));
        logging::log(
            "HOTKEY",
            &format!("Registered global hotkey {} (id: {})", display, hotkey.id()),
        );
        Ok(())
    }

    fn unregister_all(&self) {
        let Some(manager) = &self.manager else {
            self.registered.write().clear();
            return;
        };
        let drained: Vec<(HotKey, Shortcut)> =
            self.registered.write().drain().map(|(_, v)| v).collect();
        for (hotkey, shortcut) in drained {
            if let Err(e) = manager.unregister(hotkey) {
                tracing::warn!(
                    shortcut = %shortcut.to_canonical_string(),
                    error = %e,
                    "Failed to unregister global hotkey"
                );
            }
        }
    }
}

impl Default for GlobalHotkeyHook {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEventHook for GlobalHotkeyHook {
    fn install(&mut self) -> Result<(), ShortcutError> {
        if self.manager.is_some() {
            return Ok(());
        }
        let manager = GlobalHotKeyManager::new().map_err(|e| {
            ShortcutError::HookUnavailable(format!("Failed to create hotkey manager: {}", e))
        })?;
        self.manager = Some(manager);
        self.start_forwarder();
        logging::log("HOTKEY", "Global hotkey hook installed");
        Ok(())
    }

    fn uninstall(&mut self) {
        self.unregister_all();
        if self.manager.take().is_some() {
            logging::log("HOTKEY", "Global hotkey hook uninstalled");
        }
    }

    fn is_installed(&self) -> bool {
        self.manager.is_some()
    }

    fn update_bindings(&mut self, bindings: &[Shortcut]) {
        let Some(manager) = &self.manager else {
            return;
        };

        // Drop hotkeys no longer bound.
        let stale: Vec<(u32, HotKey)> = self
            .registered
            .read()
            .iter()
            .filter(|(_, (_, shortcut))| !bindings.contains(shortcut))
            .map(|(id, (hotkey, _))| (*id, *hotkey))
            .collect();
        for (id, hotkey) in stale {
            if let Err(e) = manager.unregister(hotkey) {
                tracing::warn!(hotkey_id = id, error = %e, "Failed to unregister global hotkey");
            }
            self.registered.write().remove(&id);
        }

        // Register new ones.
        for shortcut in bindings {
            let already = self
                .registered
                .read()
                .values()
                .any(|(_, existing)| existing == shortcut);
            if already {
                continue;
            }
            if let Err(e) = self.register(manager, shortcut) {
                logging::log_error("HOTKEY", &e.to_string(), None);
            }
        }
    }
}

impl Drop for GlobalHotkeyHook {
    fn drop(&mut self) {
        self.unregister_all();
    }
}
