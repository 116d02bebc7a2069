//! Configuration type definitions
//!
//! This module contains all the struct and enum definitions for configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;
use super::loader::expand_path;
use crate::shortcuts::Platform;

// ============================================
// STORE CONFIG
// ============================================

/// Where shortcut bindings are persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Path of the JSON store file (default: ~/.shortcut-kit/shortcuts.json)
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Prefix for store keys (default: "shortcut_")
    #[serde(default = "default_store_key_prefix")]
    pub key_prefix: String,
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}
fn default_store_key_prefix() -> String {
    DEFAULT_STORE_KEY_PREFIX.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: default_store_path(),
            key_prefix: default_store_key_prefix(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_path(&self.path)
    }
}

// ============================================
// LOG CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// tracing filter used when RUST_LOG is unset (default: "info")
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Directory for the JSONL log file (default: ~/.shortcut-kit/logs)
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: default_log_filter(),
            dir: default_log_dir(),
        }
    }
}

impl LogConfig {
    pub fn log_path(&self) -> PathBuf {
        expand_path(&self.dir).join(LOG_FILE_NAME)
    }
}

// ============================================
// MAIN CONFIG
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    /// Cancel a recording session after this long without input (None = never)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_timeout_ms: Option<u64>,
    /// Reserved-table and display platform (None = compile target)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    pub fn recording_timeout(&self) -> Option<Duration> {
        self.recording_timeout_ms.map(Duration::from_millis)
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }
}
