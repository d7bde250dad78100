// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Driver Logging
//!
//! Leveled logging for the device layer. Messages go through [`log_print`],
//! which filters on a global minimum level and hands the record to the `log`
//! facade under the `busio` target. With the `log` feature disabled the
//! macros still type-check their arguments but emit nothing.
//!
//! # Usage
//!
//! ```rust,ignore
//! log_info!("UART: constructed at {} baud", baudrate);
//! log_warn!("UART: {} characters dropped", dropped);
//!
//! // Conditional logging
//! log_trace_if!(LOCAL_TRACE, "RX irq drained {} chars", n);
//! ```

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

/// Log levels
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Trace-level logging (very verbose)
    Trace = 0,

    /// Debug-level logging (verbose)
    Debug = 1,

    /// Informational logging
    Info = 2,

    /// Warning-level logging
    Warning = 3,

    /// Error-level logging
    Error = 4,

    /// Unrecoverable driver state
    Fatal = 5,
}

impl LogLevel {
    /// Get the log level name as a string
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warning,
            4 => LogLevel::Error,
            _ => LogLevel::Fatal,
        }
    }
}

#[cfg(feature = "log")]
impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error | LogLevel::Fatal => log::Level::Error,
        }
    }
}

/// Log target used for every record emitted by this crate
pub const LOG_TARGET: &str = "busio";

/// Global minimum log level
///
/// Only messages at or above this level are forwarded.
static MIN_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Debug as u8);

/// Set the minimum log level
///
/// # Arguments
///
/// * `level` - Minimum log level to forward
pub fn log_set_min_level(level: LogLevel) {
    MIN_LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Get the current minimum log level
pub fn log_get_min_level() -> LogLevel {
    LogLevel::from_raw(MIN_LOG_LEVEL.load(Ordering::Relaxed))
}

/// Check whether a message at `level` would be forwarded
#[inline]
pub fn log_enabled(level: LogLevel) -> bool {
    level >= log_get_min_level()
}

/// Forward a formatted message at `level`
///
/// Called by the `log_*!` macros; rarely useful directly.
pub fn log_print(level: LogLevel, args: fmt::Arguments<'_>) {
    if !log_enabled(level) {
        return;
    }

    #[cfg(feature = "log")]
    {
        let level: log::Level = level.into();
        log::log!(target: LOG_TARGET, level, "{}", args);
    }

    #[cfg(not(feature = "log"))]
    let _ = args;
}

/// Log a trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::debug::log_print($crate::debug::LogLevel::Trace, format_args!($($arg)*))
    };
}

/// Log a trace message if condition is true
#[macro_export]
macro_rules! log_trace_if {
    ($cond:expr, $($arg:tt)*) => {
        if $cond {
            $crate::log_trace!($($arg)*);
        }
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::debug::log_print($crate::debug::LogLevel::Debug, format_args!($($arg)*))
    };
}

/// Log an info message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::debug::log_print($crate::debug::LogLevel::Info, format_args!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::debug::log_print($crate::debug::LogLevel::Warning, format_args!($($arg)*))
    };
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::debug::log_print($crate::debug::LogLevel::Error, format_args!($($arg)*))
    };
}
