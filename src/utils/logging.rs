//! Module-gated logging macros for the hot paths (sample worker, capture,
//! archive assembly).
//!
//! A module opts in by declaring the switch next to its imports:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_info, log_warn};
//! ```
//! Flip the constant to `false` to silence one noisy module without touching
//! the global `RUST_LOG` filter.

/// `log::debug!` behind the calling module's `ENABLE_LOGS` switch.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// `log::info!` behind the calling module's `ENABLE_LOGS` switch.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` behind the calling module's `ENABLE_LOGS` switch.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// `log::error!` behind the calling module's `ENABLE_LOGS` switch.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Default filter for the process logger. `GAZEPROCTOR_DEBUG=1` (or `true`)
/// lowers it to debug so per-sample decisions become visible.
pub fn default_level() -> log::LevelFilter {
    let debug_mode = std::env::var("GAZEPROCTOR_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Install `env_logger` once. Later calls are ignored so tests and the binary
/// can both call it.
pub fn init() {
    let _ = env_logger::Builder::new()
        .filter_level(default_level())
        .parse_default_env()
        .try_init();
}
