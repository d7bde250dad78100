// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! busio - Buffered Serial Byte-Stream Devices
//!
//! This crate provides the device layer that lets interpreted user code talk
//! to asynchronous, buffered hardware serial lines.
//!
//! # Organization
//!
//! - [`dev::uart`] - UART device state machine and peripheral drivers
//! - [`stream`] - Generic stream protocol (read/write/ioctl/poll) and the
//!   buffered-read/readline logic shared by every byte-stream device
//! - [`cbuf`] - Interrupt-fed receive ring buffer
//! - [`pin`] - Pin ownership registry
//! - [`platform`] - Clock, background work and console interrupt hooks
//! - [`cmdline`] - `key=value` configuration overrides
//! - [`debug`] - Logging macros
//! - [`err`] - Status codes and error types
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = Arc::new(PinRegistry::new(64));
//! let config = UartConfig::new()
//!     .tx(Pin::new(14, "TX"))
//!     .rx(Pin::new(15, "RX"))
//!     .baudrate(115_200);
//!
//! let mut uart = Uart::construct(hw, &registry, platform, config)?;
//! uart.write(b"AT\r\n")?;
//! let reply = stream::read(&mut uart, Some(4))?;
//! uart.deinit();
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
pub mod debug;

pub mod cbuf;
pub mod cmdline;
pub mod dev;
pub mod err;
pub mod pin;
pub mod platform;
pub mod stream;

#[cfg(test)]
mod tests;

// Re-exports
pub use cbuf::{RingBuffer, RxSink};
pub use dev::uart::{Parity, Uart, UartConfig, UartSession};
pub use err::{ConfigError, Error, Result, Status};
pub use pin::{Pin, PinRegistry};
pub use platform::Platform;
pub use stream::{IoctlRequest, PollFlags, Stream, StreamProperties};
