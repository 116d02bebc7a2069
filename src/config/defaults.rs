//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Prefix prepended to a Name's id to form its store key.
pub const DEFAULT_STORE_KEY_PREFIX: &str = "shortcut_";

/// Default shortcut store location (tilde-expanded at load time)
pub const DEFAULT_STORE_PATH: &str = "~/.shortcut-kit/shortcuts.json";

/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "~/.shortcut-kit/config.json";

/// Default tracing filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default directory for the JSONL log file
pub const DEFAULT_LOG_DIR: &str = "~/.shortcut-kit/logs";

/// File name of the JSONL log inside the log directory
pub const LOG_FILE_NAME: &str = "shortcut-kit.jsonl";
