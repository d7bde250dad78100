// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! ARM PL011 UART Driver
//!
//! [`UartHardware`] implementation for the ARM PrimeCell PL011 UART, the
//! standard UART of ARMv8 systems and QEMU's ARM virt machine.
//!
//! # Features
//!
//! - 7 or 8 data bits, none/even/odd parity, 1 or 2 stop bits
//! - Integer + fractional baud divider from a configurable UARTCLK
//! - Interrupt-driven RX into the device ring buffer ([`Pl011Irq`])
//! - Hardware RTS/CTS flow control
//! - RS-485 transmit enable on the nUARTOut1 modem output
//!
//! # Register Map
//!
//! | Offset | Name    | Description                |
//! |--------|---------|----------------------------|
//! | 0x00   | DR      | Data Register              |
//! | 0x04   | RSR     | Receive Status Register    |
//! | 0x18   | FR      | Flag Register              |
//! | 0x24   | IBRD    | Integer Baud Rate Divisor  |
//! | 0x28   | FBRD    | Fractional Baud Rate Div.  |
//! | 0x2C   | LCRH    | Line Control Register      |
//! | 0x30   | CR      | Control Register           |
//! | 0x34   | IFLS    | Interrupt FIFO Level Select|
//! | 0x38   | IMSC    | Interrupt Mask Set/Clear   |
//! | 0x3C   | RIS     | Raw Interrupt Status       |
//! | 0x40   | MIS     | Masked Interrupt Status    |
//! | 0x44   | ICR     | Interrupt Clear Register   |
//!
//! # Interrupt Wiring
//!
//! Interrupt controller registration belongs to the board. After
//! construction, fetch the handler with [`Pl011::irq_handle`] and call
//! [`Pl011Irq::handle`] from the UART interrupt vector.

use crate::cbuf::RxSink;
use crate::err::{ConfigError, Error, Result};

use super::hw::{LineConfig, UartHardware};
use super::Parity;

// ============================================================================
// Register Offsets
// ============================================================================

pub const UART_DR: usize = 0x00; // Data Register
pub const UART_RSR: usize = 0x04; // Receive Status Register
pub const UART_FR: usize = 0x18; // Flag Register
pub const UART_IBRD: usize = 0x24; // Integer Baud Rate Divisor
pub const UART_FBRD: usize = 0x28; // Fractional Baud Rate Divisor
pub const UART_LCRH: usize = 0x2C; // Line Control Register
pub const UART_CR: usize = 0x30; // Control Register
pub const UART_IFLS: usize = 0x34; // Interrupt FIFO Level Select
pub const UART_IMSC: usize = 0x38; // Interrupt Mask Set/Clear
pub const UART_RIS: usize = 0x3C; // Raw Interrupt Status
pub const UART_MIS: usize = 0x40; // Masked Interrupt Status
pub const UART_ICR: usize = 0x44; // Interrupt Clear Register

// ============================================================================
// Data Register Bits
// ============================================================================

pub const DR_DATA_MASK: u32 = 0xFF;
pub const DR_FE: u32 = 1 << 8; // Framing Error
pub const DR_PE: u32 = 1 << 9; // Parity Error
pub const DR_BE: u32 = 1 << 10; // Break Error
pub const DR_OE: u32 = 1 << 11; // Overrun Error

// ============================================================================
// Flag Register Bits
// ============================================================================

pub const FR_TXFE: u32 = 1 << 7; // TX FIFO Empty
pub const FR_RXFF: u32 = 1 << 6; // RX FIFO Full
pub const FR_TXFF: u32 = 1 << 5; // TX FIFO Full
pub const FR_RXFE: u32 = 1 << 4; // RX FIFO Empty
pub const FR_BUSY: u32 = 1 << 3; // UART Busy

// ============================================================================
// Line Control Register Bits
// ============================================================================

pub const LCRH_PEN: u32 = 1 << 1; // Parity Enable
pub const LCRH_EPS: u32 = 1 << 2; // Even Parity Select
pub const LCRH_STP2: u32 = 1 << 3; // Two Stop Bits
pub const LCRH_FEN: u32 = 1 << 4; // FIFO Enable
pub const LCRH_WLEN_7: u32 = 0b10 << 5; // 7 data bits
pub const LCRH_WLEN_8: u32 = 0b11 << 5; // 8 data bits

// ============================================================================
// Control Register Bits
// ============================================================================

pub const CR_CTSEN: u32 = 1 << 15; // CTS Enable
pub const CR_RTSEN: u32 = 1 << 14; // RTS Enable
pub const CR_OUT1: u32 = 1 << 12; // nUARTOut1 (active low)
pub const CR_RXE: u32 = 1 << 9; // RX Enable
pub const CR_TXE: u32 = 1 << 8; // TX Enable
pub const CR_LBE: u32 = 1 << 7; // Loopback Enable
pub const CR_UARTEN: u32 = 1 << 0; // UART Enable

// ============================================================================
// Interrupt Mask Set/Clear Bits
// ============================================================================

pub const IMSC_OE: u32 = 1 << 10; // Overrun Error Interrupt
pub const IMSC_RT: u32 = 1 << 6; // Receive Timeout Interrupt
pub const IMSC_RX: u32 = 1 << 4; // RX Interrupt

pub const ICR_ALL: u32 = 0x7FF; // Clear all interrupts

/// Reference clock of QEMU's virt machine
pub const DEFAULT_CLOCK_HZ: u32 = 24_000_000;

const LOCAL_TRACE: bool = false;

// ============================================================================
// Register Access
// ============================================================================

/// 32-bit register window of one PL011 instance
pub trait Pl011Regs: Clone + Send + Sync {
    fn read(&self, offset: usize) -> u32;
    fn write(&self, offset: usize, value: u32);

    #[inline]
    fn set_bits(&self, offset: usize, bits: u32) {
        self.write(offset, self.read(offset) | bits);
    }

    #[inline]
    fn clear_bits(&self, offset: usize, bits: u32) {
        self.write(offset, self.read(offset) & !bits);
    }
}

/// Memory-mapped register window
#[derive(Debug, Clone, Copy)]
pub struct MmioRegs {
    base: usize,
}

impl MmioRegs {
    /// Wrap a mapped register window
    ///
    /// # Safety
    ///
    /// `base` must be the virtual address of a mapped PL011 register block
    /// that stays mapped for the lifetime of the returned value and all of
    /// its clones.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base virtual address
    pub fn base(&self) -> usize {
        self.base
    }
}

impl Pl011Regs for MmioRegs {
    #[inline]
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` requires a mapped PL011 block
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[inline]
    fn write(&self, offset: usize, value: u32) {
        // SAFETY: `new` requires a mapped PL011 block
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

// ============================================================================
// Divider / Line Control
// ============================================================================

/// Compute the (IBRD, FBRD) pair for `baudrate`
///
/// The divider is `clock / (16 * baudrate)` with a 6-bit fraction, rounded
/// to nearest.
///
/// # Errors
///
/// `Config(InvalidBaudrate)` if the integer part falls outside 1..=0xFFFF
pub fn baud_divisor(clock_hz: u32, baudrate: u32) -> Result<(u32, u32)> {
    if baudrate == 0 {
        return Err(ConfigError::InvalidBaudrate(baudrate).into());
    }

    // 64 * clock / (16 * baud), rounded
    let quot = (clock_hz as u64 * 4 + baudrate as u64 / 2) / baudrate as u64;
    let ibrd = quot >> 6;
    let fbrd = quot & 0x3F;

    if ibrd == 0 || ibrd > 0xFFFF {
        return Err(ConfigError::InvalidBaudrate(baudrate).into());
    }

    Ok((ibrd as u32, fbrd as u32))
}

/// Encode framing into an LCRH value (FIFOs enabled)
///
/// # Errors
///
/// `NotSupported` for 9-bit characters
pub fn line_control(bits: u8, parity: Parity, stop: u8) -> Result<u32> {
    let mut lcrh = LCRH_FEN;

    lcrh |= match bits {
        7 => LCRH_WLEN_7,
        8 => LCRH_WLEN_8,
        _ => return Err(Error::NotSupported),
    };

    lcrh |= match parity {
        Parity::None => 0,
        Parity::Even => LCRH_PEN | LCRH_EPS,
        Parity::Odd => LCRH_PEN,
    };

    if stop == 2 {
        lcrh |= LCRH_STP2;
    }

    Ok(lcrh)
}

// ============================================================================
// Interrupt Handler
// ============================================================================

/// Receive interrupt handler for one PL011
///
/// Owns only a register window and the ring buffer producer, so it can be
/// moved into an interrupt vector table.
#[derive(Clone)]
pub struct Pl011Irq<R: Pl011Regs> {
    regs: R,
    sink: RxSink,
    /// Leave data in the FIFO when the buffer is full so RTS deasserts
    hold_when_full: bool,
}

impl<R: Pl011Regs> Pl011Irq<R> {
    /// Service the interrupt
    ///
    /// Drains the RX FIFO into the ring buffer. Without flow control a full
    /// buffer drops the newest characters. With RTS flow control the RX
    /// interrupt is masked instead and the data stays in the FIFO until the
    /// consumer frees space.
    ///
    /// # Returns
    ///
    /// Number of characters moved into the buffer
    pub fn handle(&self) -> usize {
        let mis = self.regs.read(UART_MIS);
        let mut count = 0;

        if mis & (IMSC_RX | IMSC_RT | IMSC_OE) != 0 {
            while self.regs.read(UART_FR) & FR_RXFE == 0 {
                if self.hold_when_full && self.sink.space_avail() == 0 {
                    self.regs.clear_bits(UART_IMSC, IMSC_RX | IMSC_RT);
                    log_trace_if!(LOCAL_TRACE, "PL011: buffer full, RX masked");
                    break;
                }

                let dr = self.regs.read(UART_DR);
                if dr & DR_OE != 0 {
                    // FIFO overflowed before this character was read
                    self.sink.record_overrun();
                }
                if self.sink.push((dr & DR_DATA_MASK) as u16) {
                    count += 1;
                }
            }
        }

        self.regs.write(UART_ICR, mis);
        log_trace_if!(LOCAL_TRACE, "PL011: irq mis={:#x} rx={}", mis, count);
        count
    }
}

// ============================================================================
// Driver
// ============================================================================

/// PL011 peripheral driver
pub struct Pl011<R: Pl011Regs> {
    regs: R,
    clock_hz: u32,
    irq: Option<Pl011Irq<R>>,
    flow_control: bool,
}

impl<R: Pl011Regs> Pl011<R> {
    /// Create a driver for the block behind `regs`
    ///
    /// # Arguments
    ///
    /// * `regs` - Register window
    /// * `clock_hz` - UARTCLK frequency
    pub fn new(regs: R, clock_hz: u32) -> Self {
        Self {
            regs,
            clock_hz,
            irq: None,
            flow_control: false,
        }
    }

    /// Interrupt handler, available while the receive path is installed
    pub fn irq_handle(&self) -> Option<Pl011Irq<R>> {
        self.irq.clone()
    }

    /// Register window
    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// UARTCLK frequency
    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    fn write_divisor(&self, baudrate: u32) -> Result {
        let (ibrd, fbrd) = baud_divisor(self.clock_hz, baudrate)?;
        self.regs.write(UART_IBRD, ibrd);
        self.regs.write(UART_FBRD, fbrd);
        Ok(())
    }
}

impl<R: Pl011Regs> UartHardware for Pl011<R> {
    fn configure(&mut self, config: &LineConfig) -> Result {
        let lcrh = line_control(config.bits, config.parity, config.stop)?;
        let (ibrd, fbrd) = baud_divisor(self.clock_hz, config.baudrate)?;

        // Disable while reprogramming; clearing FEN flushes the FIFOs
        self.regs.write(UART_CR, 0);
        self.regs.write(UART_LCRH, 0);

        // Divisors latch on the following LCRH write
        self.regs.write(UART_IBRD, ibrd);
        self.regs.write(UART_FBRD, fbrd);
        self.regs.write(UART_LCRH, lcrh);

        self.regs.write(UART_ICR, ICR_ALL);
        self.regs.write(UART_IFLS, 0);
        self.regs.write(UART_IMSC, 0);

        let mut cr = CR_UARTEN;
        if config.tx {
            cr |= CR_TXE;
        }
        if config.rx {
            cr |= CR_RXE;
        }
        if config.rts {
            cr |= CR_RTSEN;
        }
        if config.cts {
            cr |= CR_CTSEN;
        }
        self.regs.write(UART_CR, cr);

        self.flow_control = config.rts;

        log_debug!(
            "PL011: clk={} baud={} ibrd={} fbrd={} lcrh={:#x} cr={:#x}",
            self.clock_hz,
            config.baudrate,
            ibrd,
            fbrd,
            lcrh,
            cr
        );
        Ok(())
    }

    fn set_baudrate(&mut self, baudrate: u32) -> Result {
        self.write_divisor(baudrate)?;
        let lcrh = self.regs.read(UART_LCRH);
        self.regs.write(UART_LCRH, lcrh);
        Ok(())
    }

    fn enable_rx(&mut self, sink: RxSink) -> Result {
        self.irq = Some(Pl011Irq {
            regs: self.regs.clone(),
            sink,
            hold_when_full: self.flow_control,
        });
        self.regs.write(UART_ICR, IMSC_RX | IMSC_RT | IMSC_OE);
        self.regs.set_bits(UART_IMSC, IMSC_RX | IMSC_RT | IMSC_OE);
        Ok(())
    }

    fn disable_rx(&mut self) {
        self.regs.clear_bits(UART_IMSC, IMSC_RX | IMSC_RT | IMSC_OE);
        self.irq = None;
    }

    fn rx_resume(&mut self) {
        if self.irq.is_some() {
            self.regs.set_bits(UART_IMSC, IMSC_RX | IMSC_RT);
        }
    }

    /// The PL011 only reports empty/full, so this is 0 or 1
    fn rx_pending(&self) -> usize {
        if self.regs.read(UART_FR) & FR_RXFE == 0 {
            1
        } else {
            0
        }
    }

    fn read_word(&mut self) -> Option<u16> {
        if self.regs.read(UART_FR) & FR_RXFE != 0 {
            return None;
        }
        Some((self.regs.read(UART_DR) & DR_DATA_MASK) as u16)
    }

    fn tx_ready(&self) -> bool {
        self.regs.read(UART_FR) & FR_TXFF == 0
    }

    fn write_word(&mut self, word: u16) {
        self.regs.write(UART_DR, word as u32 & DR_DATA_MASK);
    }

    fn tx_idle(&self) -> bool {
        let fr = self.regs.read(UART_FR);
        fr & FR_TXFE != 0 && fr & FR_BUSY == 0
    }

    fn set_direction(&mut self, high: bool) {
        // Out1 is active low: setting the bit drives the pin low
        if high {
            self.regs.clear_bits(UART_CR, CR_OUT1);
        } else {
            self.regs.set_bits(UART_CR, CR_OUT1);
        }
    }

    fn deinit(&mut self) {
        self.regs.write(UART_IMSC, 0);
        self.regs.write(UART_ICR, ICR_ALL);
        self.regs.write(UART_CR, 0);
        self.irq = None;
        log_debug!("PL011: disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_divisor() {
        // 24 MHz / (16 * 115200) = 13.0208 -> 13 + 1/64
        assert_eq!(baud_divisor(24_000_000, 115_200), Ok((13, 1)));
        // 24 MHz / (16 * 9600) = 156.25 -> 156 + 16/64
        assert_eq!(baud_divisor(24_000_000, 9600), Ok((156, 16)));
        // 48 MHz / (16 * 3_000_000) = 1.0
        assert_eq!(baud_divisor(48_000_000, 3_000_000), Ok((1, 0)));
    }

    #[test]
    fn test_baud_divisor_range() {
        assert!(baud_divisor(24_000_000, 0).is_err());
        // Divider below 1
        assert!(baud_divisor(24_000_000, 4_000_000).is_err());
        // Divider above 0xFFFF
        assert!(baud_divisor(24_000_000, 10).is_err());
    }

    #[test]
    fn test_line_control() {
        assert_eq!(
            line_control(8, Parity::None, 1),
            Ok(LCRH_FEN | LCRH_WLEN_8)
        );
        assert_eq!(
            line_control(7, Parity::Even, 2),
            Ok(LCRH_FEN | LCRH_WLEN_7 | LCRH_PEN | LCRH_EPS | LCRH_STP2)
        );
        assert_eq!(
            line_control(8, Parity::Odd, 1),
            Ok(LCRH_FEN | LCRH_WLEN_8 | LCRH_PEN)
        );
        assert_eq!(line_control(9, Parity::None, 1), Err(Error::NotSupported));
    }
}
