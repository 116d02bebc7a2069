//! Structured JSONL logging and human-readable stderr output.
//!
//! This module provides dual-output logging:
//! - **JSONL to file** (~/.shortcut-kit/logs/shortcut-kit.jsonl) - structured, one event per line
//! - **Compact to stderr** - human-readable for developers
//!
//! The library never installs a subscriber by itself; the binary (or a host
//! application) calls [`init`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use shortcut_kit::{config::LogConfig, logging};
//!
//! // MUST keep guard alive for duration of program
//! let _guard = logging::init(&LogConfig::default());
//!
//! tracing::info!(event_type = "app_start", "Application started");
//! ```
//!
//! # JSONL Output Format
//!
//! ```json
//! {"timestamp":"2026-01-05T10:30:45.123Z","level":"INFO","target":"shortcut_kit::shortcuts::persistence","fields":{"message":"Saved shortcut","name":"toggle"}}
//! ```

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io;
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogConfig;
use crate::hotkeys::{KeyEvent, KeyPhase};

// =============================================================================
// In-memory log buffer for UI display
// =============================================================================

static LOG_BUFFER: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();
const MAX_LOG_LINES: usize = 50;

fn buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_BUFFER.get_or_init(|| Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES)))
}

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the dual-output logging system.
///
/// Falls back to stderr-only output when the log file cannot be opened.
/// Calling it twice is harmless; the second subscriber is not installed.
pub fn init(config: &LogConfig) -> LoggingGuard {
    let log_path = config.log_path();
    if let Some(dir) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("[LOGGING] Failed to create log directory: {}", e);
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eprintln!("[LOGGING] Failed to open log file: {}", e))
        .ok();

    // Environment filter - configured default, allow override via RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    // Compact layer for stderr (human developers)
    let pretty_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    let (json_layer, file_guard) = match file {
        Some(file) => {
            // Non-blocking writer so logging never stalls key-event delivery
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_span_events(FmtSpan::NONE);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            event_type = "app_lifecycle",
            action = "started",
            log_path = %log_path.display(),
            "Logging initialized"
        );
    }

    LoggingGuard {
        _file_guard: file_guard,
    }
}

// =============================================================================
// Category logger
// =============================================================================

/// Category-tagged log line, kept in the recent-lines buffer and forwarded to
/// tracing. Prefer tracing macros with structured fields in new code.
pub fn log(category: &str, message: &str) {
    add_to_buffer(category, message);
    tracing::info!(category = category, legacy = true, "{}", message);
}

fn add_to_buffer(category: &str, message: &str) {
    let mut buf = buffer().lock();
    if buf.len() >= MAX_LOG_LINES {
        buf.pop_front();
    }
    buf.push_back(format!("[{}] {}", category, message));
}

/// Recent log lines, oldest first
pub fn get_recent_logs() -> Vec<String> {
    buffer().lock().iter().cloned().collect()
}

/// The last N log lines, newest first
pub fn get_last_logs(n: usize) -> Vec<String> {
    buffer().lock().iter().rev().take(n).cloned().collect()
}

// =============================================================================
// STRUCTURED LOGGING HELPERS
// =============================================================================

/// Log a raw key event with structured fields
pub fn log_key_event(event: &KeyEvent, source: &str) {
    let shortcut = event.shortcut().to_canonical_string();
    let action = match event.phase {
        KeyPhase::Down => "down",
        KeyPhase::Up => "up",
        KeyPhase::FlagsChanged => "flags",
    };
    add_to_buffer("KEY", &format!("{} {} ({})", action, shortcut, source));

    tracing::debug!(
        event_type = "key_event",
        shortcut = %shortcut,
        action = action,
        is_repeat = event.is_repeat,
        source = source,
        "Key {} {}", action, shortcut
    );
}

/// Log an error with structured fields and context
pub fn log_error(category: &str, error: &str, context: Option<&str>) {
    let msg = match context {
        Some(ctx) => format!("{}: {} (context: {})", category, error, ctx),
        None => format!("{}: {}", category, error),
    };
    add_to_buffer("ERROR", &msg);

    tracing::error!(
        event_type = "error",
        category = category,
        error_message = error,
        context = context,
        "{}", msg
    );
}
