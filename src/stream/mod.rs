// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Stream Protocol
//!
//! Every byte-oriented device (UART, USB CDC, sockets, ...) exposes the
//! same capability set: [`Stream::read`], [`Stream::write`] and
//! [`Stream::ioctl`]. The user-facing operations in [`ops`] (read, readinto,
//! readline, write, poll, line iteration) are written once against this
//! trait.
//!
//! # Result Conventions
//!
//! - `Ok(0)` from `read` means end of stream
//! - `Err(Error::ShouldWait)` means no progress was possible right now; the
//!   generic layer reports it as `None` rather than as an error
//! - Any other error is a hard failure

pub mod ops;

use bitflags::bitflags;

use crate::err::Result;

pub use ops::{flush, lines, poll, read, readinto, readline, write, Lines};

bitflags! {
    /// Readiness events for [`IoctlRequest::Poll`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PollFlags: u32 {
        /// Data available to read
        const RD = 0x01;
        /// Ready to accept a write
        const WR = 0x04;
        /// Error condition
        const ERR = 0x08;
        /// Peer hung up
        const HUP = 0x10;
        /// Invalid stream
        const NVAL = 0x20;
    }
}

/// Stream control requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlRequest {
    /// Report which of the given events are ready
    Poll(PollFlags),
    /// Wait until buffered output has been sent
    Flush,
    /// Device-specific request code
    Other(u32),
}

/// Static stream behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamProperties {
    /// Text streams decode to strings
    pub is_text: bool,
    /// `readinto` rejects an explicit length different from the buffer
    pub pyserial_compatibility: bool,
}

/// Byte-stream capability set
pub trait Stream {
    /// Read up to `buf.len()` bytes
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write bytes from `buf`, returning how many were accepted
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Control request
    ///
    /// `Poll` returns the ready flags as `usize`.
    fn ioctl(&mut self, request: IoctlRequest) -> Result<usize>;

    fn properties(&self) -> StreamProperties {
        StreamProperties::default()
    }
}

impl<S: Stream + ?Sized> Stream for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn ioctl(&mut self, request: IoctlRequest) -> Result<usize> {
        (**self).ioctl(request)
    }

    fn properties(&self) -> StreamProperties {
        (**self).properties()
    }
}
