//! Configuration module - store location, platform and logging settings
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, StoreConfig, LogConfig)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{
    DEFAULT_CONFIG_PATH, DEFAULT_LOG_DIR, DEFAULT_LOG_FILTER, DEFAULT_STORE_KEY_PREFIX,
    DEFAULT_STORE_PATH, LOG_FILE_NAME,
};

pub use types::{Config, LogConfig, StoreConfig};

pub use loader::{default_config_path, expand_path, load_config};
