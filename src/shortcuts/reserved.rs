//! Reserved-combination catalog.
//!
//! Two sources are merged:
//! - a static per-platform table of OS combinations an app can never intercept
//! - whatever the host reports through [`ReservedCatalogProvider`] (menu
//!   command shortcuts, plus optional live system hotkeys)
//!
//! The provider is queried for every snapshot. Menus change at runtime, so
//! nothing is cached between validations.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use super::types::{Platform, Shortcut};

/// Where a reserved combination comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReservedSource {
    /// Claimed by the OS; `label` names the feature (e.g. "Spotlight").
    System { label: String },
    /// Claimed by a menu item of the host application.
    Menu { title: String },
}

/// A reserved combination and who claims it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservedEntry {
    pub shortcut: Shortcut,
    pub source: ReservedSource,
}

/// A menu item as reported by the host. Submenus nest through `children`.
#[derive(Clone, Debug, Default)]
pub struct MenuItem {
    pub title: String,
    /// Disabled items (and everything under a disabled submenu) claim no
    /// shortcut. The catalog is rescanned on every validation, so an item
    /// enabled later is seen then.
    pub enabled: bool,
    pub shortcut: Option<Shortcut>,
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    pub fn new(title: impl Into<String>, shortcut: Option<Shortcut>) -> Self {
        Self {
            title: title.into(),
            enabled: true,
            shortcut,
            children: Vec::new(),
        }
    }

    pub fn submenu(title: impl Into<String>, children: Vec<MenuItem>) -> Self {
        Self {
            title: title.into(),
            enabled: true,
            shortcut: None,
            children,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Live source of reserved combinations.
///
/// Platform menu-walking code implements this; tests pass a mock.
pub trait ReservedCatalogProvider: Send + Sync {
    /// Current top-level menus of the host application.
    fn menu_items(&self) -> Vec<MenuItem>;

    /// Hotkeys the OS currently claims beyond the static table.
    fn system_shortcuts(&self) -> Vec<(Shortcut, String)> {
        Vec::new()
    }
}

/// Provider for hosts without a menu bar.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMenus;

impl ReservedCatalogProvider for NoMenus {
    fn menu_items(&self) -> Vec<MenuItem> {
        Vec::new()
    }
}

/// Static OS table: canonical shortcut string -> feature label.
fn system_table(platform: Platform) -> &'static [(&'static str, &'static str)] {
    match platform {
        Platform::MacOS => &[
            ("cmd+tab", "App Switcher"),
            ("cmd+shift+tab", "App Switcher"),
            ("cmd+backquote", "Cycle Windows"),
            ("cmd+space", "Spotlight"),
            ("cmd+alt+space", "Finder Search"),
            ("ctrl+space", "Select Previous Input Source"),
            ("ctrl+alt+space", "Select Next Input Source"),
            ("cmd+alt+escape", "Force Quit"),
            ("cmd+ctrl+q", "Lock Screen"),
            ("cmd+shift+q", "Log Out"),
            ("cmd+alt+shift+q", "Log Out"),
            ("cmd+alt+d", "Dock"),
            ("cmd+shift+3", "Screenshot"),
            ("cmd+shift+4", "Screenshot"),
            ("cmd+shift+5", "Screenshot"),
            ("cmd+shift+6", "Screenshot"),
            ("ctrl+up", "Mission Control"),
            ("ctrl+down", "Application Windows"),
            ("ctrl+left", "Move Left a Space"),
            ("ctrl+right", "Move Right a Space"),
            ("ctrl+f2", "Keyboard Navigation"),
            ("ctrl+f3", "Keyboard Navigation"),
            ("ctrl+f4", "Keyboard Navigation"),
            ("ctrl+f5", "Keyboard Navigation"),
            ("ctrl+f8", "Keyboard Navigation"),
            ("cmd+alt+8", "Zoom"),
            ("cmd+f5", "VoiceOver"),
            ("cmd+alt+f5", "Accessibility Shortcuts"),
        ],
        Platform::Windows => &[
            ("alt+tab", "App Switcher"),
            ("cmd+tab", "Task View"),
            ("cmd+d", "Show Desktop"),
            ("cmd+l", "Lock Screen"),
            ("cmd+e", "File Explorer"),
            ("cmd+r", "Run"),
            ("alt+f4", "Close Window"),
            ("ctrl+alt+delete", "Security Options"),
            ("ctrl+shift+escape", "Task Manager"),
        ],
        Platform::Linux => &[
            ("alt+tab", "Window Switcher"),
            ("cmd+tab", "Window Switcher"),
            ("alt+f4", "Close Window"),
            ("cmd+l", "Lock Screen"),
            ("cmd+d", "Show Desktop"),
            ("ctrl+alt+t", "Terminal"),
            ("ctrl+alt+delete", "Log Out"),
        ],
    }
}

fn parsed_system_table(platform: Platform) -> &'static HashMap<Shortcut, &'static str> {
    static MACOS: OnceLock<HashMap<Shortcut, &'static str>> = OnceLock::new();
    static WINDOWS: OnceLock<HashMap<Shortcut, &'static str>> = OnceLock::new();
    static LINUX: OnceLock<HashMap<Shortcut, &'static str>> = OnceLock::new();

    let cell = match platform {
        Platform::MacOS => &MACOS,
        Platform::Windows => &WINDOWS,
        Platform::Linux => &LINUX,
    };
    cell.get_or_init(|| {
        system_table(platform)
            .iter()
            .filter_map(|(combo, label)| match Shortcut::parse(combo) {
                Ok(shortcut) => Some((shortcut, *label)),
                Err(e) => {
                    warn!(combo = combo, error = %e, "Skipping unparseable reserved combination");
                    None
                }
            })
            .collect()
    })
}

/// Point-in-time view of every reserved combination.
#[derive(Clone, Debug, Default)]
pub struct ReservedSnapshot {
    live_system: Vec<ReservedEntry>,
    menu: Vec<ReservedEntry>,
    platform: Option<Platform>,
}

impl ReservedSnapshot {
    /// Is `shortcut` claimed by the system or a menu item?
    ///
    /// System claims win over menu claims.
    pub fn is_reserved(&self, shortcut: &Shortcut) -> Option<ReservedEntry> {
        if let Some(platform) = self.platform {
            if let Some(label) = parsed_system_table(platform).get(shortcut) {
                return Some(ReservedEntry {
                    shortcut: *shortcut,
                    source: ReservedSource::System {
                        label: (*label).to_string(),
                    },
                });
            }
        }
        self.live_system
            .iter()
            .chain(self.menu.iter())
            .find(|entry| entry.shortcut == *shortcut)
            .cloned()
    }

    pub fn menu_entries(&self) -> &[ReservedEntry] {
        &self.menu
    }
}

fn flatten_menu(items: &[MenuItem], out: &mut Vec<ReservedEntry>) {
    for item in items.iter().filter(|item| item.enabled) {
        if let Some(shortcut) = item.shortcut {
            out.push(ReservedEntry {
                shortcut,
                source: ReservedSource::Menu {
                    title: item.title.clone(),
                },
            });
        }
        flatten_menu(&item.children, out);
    }
}

/// Static table + live provider for one platform.
#[derive(Clone)]
pub struct ReservedCatalog {
    platform: Platform,
    provider: Arc<dyn ReservedCatalogProvider>,
}

impl ReservedCatalog {
    pub fn new(platform: Platform, provider: Arc<dyn ReservedCatalogProvider>) -> Self {
        Self { platform, provider }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Query the provider now. May be slow; never call while holding a lock
    /// that event delivery needs.
    pub fn snapshot(&self) -> ReservedSnapshot {
        let mut menu = Vec::new();
        flatten_menu(&self.provider.menu_items(), &mut menu);
        let live_system = self
            .provider
            .system_shortcuts()
            .into_iter()
            .map(|(shortcut, label)| ReservedEntry {
                shortcut,
                source: ReservedSource::System { label },
            })
            .collect();
        debug!(menu_count = menu.len(), "Built reserved snapshot");
        ReservedSnapshot {
            live_system,
            menu,
            platform: Some(self.platform),
        }
    }

    pub fn is_reserved(&self, shortcut: &Shortcut) -> Option<ReservedEntry> {
        self.snapshot().is_reserved(shortcut)
    }
}
