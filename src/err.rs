// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Error Codes
//!
//! This module provides the status codes and error types used throughout
//! the device layer.
//!
//! # Taxonomy
//!
//! - **Configuration errors**: invalid construction or setter arguments.
//!   Surfaced immediately, never retried.
//! - **Device state errors**: an operation on a deinitialized device.
//! - **Transient conditions**: no data ready / transmitter not ready. Not a
//!   failure; the generic stream layer turns it into a "no progress" result.
//! - **Cancellation**: the console interrupt aborted a wait.

use core::fmt;

use crate::pin::Pin;

/// Raw status code, as carried through the stream protocol
pub type Status = i32;

/// Success status code
pub const OK: Status = 0;

/// Invalid arguments error
pub const ERR_INVALID_ARGS: Status = -2;

/// Bad state error (object deinitialized)
pub const ERR_BAD_STATE: Status = -4;

/// Not supported error
pub const ERR_NOT_SUPPORTED: Status = -5;

/// Resource already claimed
pub const ERR_ALREADY_EXISTS: Status = -9;

/// I/O error
pub const ERR_IO: Status = -11;

/// Allocation failed
pub const ERR_NO_MEMORY: Status = -12;

/// Operation would block; try again later
pub const ERR_SHOULD_WAIT: Status = -18;

/// Operation canceled by the console interrupt
pub const ERR_CANCELED: Status = -21;

/// Result type for operations that can fail
pub type Result<T = ()> = core::result::Result<T, Error>;

/// Invalid construction or setter argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a TX nor an RX pin was given
    NoPins,
    /// Pin is claimed by another device
    PinInUse(Pin),
    /// Same pin requested for two roles
    DuplicatePin(Pin),
    /// Pin number is outside the registry
    InvalidPin(Pin),
    /// Bits per character outside 7..=9
    InvalidBits(u8),
    /// Stop bits other than 1 or 2
    InvalidStop(u8),
    /// Timeout outside 0.0..=100.0 seconds
    InvalidTimeout,
    /// Zero baud rate
    InvalidBaudrate(u32),
    /// Parity name not recognized
    InvalidParity,
    /// Malformed `key=value` override
    InvalidValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoPins => write!(f, "tx and rx cannot both be None"),
            ConfigError::PinInUse(pin) => write!(f, "{} in use", pin),
            ConfigError::DuplicatePin(pin) => write!(f, "{} requested more than once", pin),
            ConfigError::InvalidPin(pin) => write!(f, "Invalid pin {}", pin),
            ConfigError::InvalidBits(_) => write!(f, "bits must be 7, 8 or 9"),
            ConfigError::InvalidStop(_) => write!(f, "stop must be 1 or 2"),
            ConfigError::InvalidTimeout => write!(f, "timeout must be 0.0-100.0 seconds"),
            ConfigError::InvalidBaudrate(_) => write!(f, "baudrate must be positive"),
            ConfigError::InvalidParity => write!(f, "parity must be none, even or odd"),
            ConfigError::InvalidValue(key) => write!(f, "invalid value for {}", key),
        }
    }
}

/// Common error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Value-domain violation at construction or in a setter
    Config(ConfigError),
    /// Operation attempted after deinit
    Deinitialized,
    /// No data ready / not ready to transmit
    ShouldWait,
    /// Wait aborted by the console interrupt
    Canceled,
    /// Stream-level misuse (unsupported ioctl, forbidden length)
    InvalidArgs,
    /// Peripheral cannot provide the requested configuration
    NotSupported,
    /// Hardware fault
    Io,
    /// Buffer allocation failed
    NoMemory,
}

impl Error {
    /// Convert error to status code
    pub fn to_status(self) -> Status {
        match self {
            Error::Config(ConfigError::PinInUse(_)) => ERR_ALREADY_EXISTS,
            Error::Config(_) => ERR_INVALID_ARGS,
            Error::Deinitialized => ERR_BAD_STATE,
            Error::ShouldWait => ERR_SHOULD_WAIT,
            Error::Canceled => ERR_CANCELED,
            Error::InvalidArgs => ERR_INVALID_ARGS,
            Error::NotSupported => ERR_NOT_SUPPORTED,
            Error::Io => ERR_IO,
            Error::NoMemory => ERR_NO_MEMORY,
        }
    }

    /// Whether this is the non-blocking "no progress" condition
    #[inline]
    pub fn is_transient(self) -> bool {
        matches!(self, Error::ShouldWait)
    }

    /// Whether this is a configuration error
    #[inline]
    pub fn is_config(self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        err.to_status()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(err) => err.fmt(f),
            Error::Deinitialized => write!(
                f,
                "Object has been deinitialized and can no longer be used. Create a new object."
            ),
            Error::ShouldWait => write!(f, "operation would block"),
            Error::Canceled => write!(f, "operation interrupted"),
            Error::InvalidArgs => write!(f, "invalid argument"),
            Error::NotSupported => write!(f, "not supported by this peripheral"),
            Error::Io => write!(f, "I/O error"),
            Error::NoMemory => write!(f, "out of memory"),
        }
    }
}
