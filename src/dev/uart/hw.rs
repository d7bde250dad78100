// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! UART Hardware Interface
//!
//! The device state machine in [`super`] is peripheral independent. Each
//! UART block implements [`UartHardware`] to program framing and the baud
//! divider, move single characters through its FIFOs, and feed received
//! characters to an [`RxSink`] from its interrupt handler.
//!
//! Characters are carried as `u16` so 9-bit frames fit; drivers for 7 and
//! 8-bit frames only look at the low byte.

use crate::cbuf::RxSink;
use crate::err::Result;

use super::Parity;

/// Line settings handed to [`UartHardware::configure`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Data bits per character (7, 8 or 9)
    pub bits: u8,
    /// Parity mode
    pub parity: Parity,
    /// Stop bits (1 or 2)
    pub stop: u8,
    /// Transmitter in use
    pub tx: bool,
    /// Receiver in use
    pub rx: bool,
    /// Hardware RTS flow control
    pub rts: bool,
    /// Hardware CTS flow control
    pub cts: bool,
    /// RS-485 direction output in use
    pub rs485: bool,
}

/// Peripheral driver operations used by [`Uart`](super::Uart)
pub trait UartHardware: Send {
    /// Program framing and baud divider, enable the requested directions
    ///
    /// # Errors
    ///
    /// - `NotSupported` if the block cannot produce the framing
    /// - `Config(InvalidBaudrate)` if the divider is out of range
    fn configure(&mut self, config: &LineConfig) -> Result;

    /// Reprogram the baud divider only
    fn set_baudrate(&mut self, baudrate: u32) -> Result;

    /// Install the receive interrupt producer
    fn enable_rx(&mut self, sink: RxSink) -> Result;

    /// Stop feeding the receive buffer
    fn disable_rx(&mut self);

    /// Called after the consumer freed buffer space
    ///
    /// Drivers that mask the receive interrupt when the buffer fills
    /// unmask it here.
    fn rx_resume(&mut self) {}

    /// Characters waiting in the peripheral's own receive FIFO
    fn rx_pending(&self) -> usize;

    /// Take one character straight from the receive FIFO
    fn read_word(&mut self) -> Option<u16>;

    /// Whether the transmit FIFO accepts another character
    fn tx_ready(&self) -> bool;

    /// Queue one character for transmission
    ///
    /// Only called after `tx_ready` returned true.
    fn write_word(&mut self, word: u16);

    /// Whether the transmitter has shifted out every queued character
    fn tx_idle(&self) -> bool;

    /// Software clear-to-send check for blocks without hardware CTS gating
    fn clear_to_send(&self) -> bool {
        true
    }

    /// Drive the RS-485 direction output
    fn set_direction(&mut self, _high: bool) {}

    /// Disable the block
    fn deinit(&mut self);
}
