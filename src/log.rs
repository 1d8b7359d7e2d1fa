// src/log.rs
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::consts::{LOG_ENV, LOG_FILE, STORE_DIR};

/// Install the global subscriber: uptime-stamped lines appended to `.store/debug.log`,
/// level taken from `FLAT_SCRAPE_LOG` (default `info`). Falls back to stderr when the
/// log file can't be opened. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_timer(fmt::time::uptime())
        .with_target(false);

    let _ = match open_log_file() {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
}

fn open_log_file() -> Option<File> {
    fs::create_dir_all(STORE_DIR).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(Path::new(STORE_DIR).join(LOG_FILE))
        .ok()
}

/// Info-level logging
#[macro_export]
macro_rules! logf {
    ($($arg:tt)*) => {
        ::tracing::info!($($arg)*)
    };
}

/// Debug-level logging
#[macro_export]
macro_rules! logd {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

/// Warn-level logging
#[macro_export]
macro_rules! logw {
    ($($arg:tt)*) => {
        ::tracing::warn!($($arg)*)
    };
}

/// Error-level logging
#[macro_export]
macro_rules! loge {
    ($($arg:tt)*) => {
        ::tracing::error!($($arg)*)
    };
}
