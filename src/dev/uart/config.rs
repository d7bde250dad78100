// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! UART Construction Parameters
//!
//! [`UartConfig`] carries every argument of UART construction with its
//! default. Values are checked by [`UartConfig::validate`] before any pin is
//! claimed, and can be overridden from boot arguments with
//! [`UartConfig::apply_cmdline`].

use alloc::format;
use core::fmt;

use crate::cmdline::Cmdline;
use crate::err::{ConfigError, Result};
use crate::pin::Pin;

/// Default baud rate
pub const DEFAULT_BAUDRATE: u32 = 9600;

/// Default bits per character
pub const DEFAULT_BITS: u8 = 8;

/// Default stop bits
pub const DEFAULT_STOP: u8 = 1;

/// Default read/write timeout in seconds
pub const DEFAULT_TIMEOUT: f32 = 1.0;

/// Default receive buffer capacity in characters
pub const DEFAULT_RX_BUFFER_SIZE: usize = 64;

/// Longest accepted timeout in seconds
pub const MAX_TIMEOUT: f32 = 100.0;

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

impl Parity {
    /// Parse `none`, `even` or `odd` (any case)
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("none") {
            Some(Parity::None)
        } else if name.eq_ignore_ascii_case("even") {
            Some(Parity::Even)
        } else if name.eq_ignore_ascii_case("odd") {
            Some(Parity::Odd)
        } else {
            None
        }
    }

    /// Member name as shown to user code
    pub fn as_str(self) -> &'static str {
        match self {
            Parity::None => "NONE",
            Parity::Even => "EVEN",
            Parity::Odd => "ODD",
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "busio.UART.Parity.{}", self.as_str())
    }
}

/// UART construction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UartConfig {
    /// Transmit pin
    pub tx: Option<Pin>,
    /// Receive pin
    pub rx: Option<Pin>,
    /// Hardware flow control output
    pub rts: Option<Pin>,
    /// Hardware flow control input; writes wait while it is deasserted
    pub cts: Option<Pin>,
    /// RS-485 transmit enable output
    pub rs485_dir: Option<Pin>,
    /// Drive the direction pin low (instead of high) while transmitting
    pub rs485_invert: bool,
    /// Line rate in bits per second
    pub baudrate: u32,
    /// Data bits per character: 7, 8 or 9
    pub bits: u8,
    /// Parity mode
    pub parity: Parity,
    /// Stop bits: 1 or 2
    pub stop: u8,
    /// Seconds, 0.0 to 100.0 inclusive
    pub timeout: f32,
    /// Characters; 0 reads the peripheral FIFO directly
    pub receiver_buffer_size: usize,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            tx: None,
            rx: None,
            rts: None,
            cts: None,
            rs485_dir: None,
            rs485_invert: false,
            baudrate: DEFAULT_BAUDRATE,
            bits: DEFAULT_BITS,
            parity: Parity::None,
            stop: DEFAULT_STOP,
            timeout: DEFAULT_TIMEOUT,
            receiver_buffer_size: DEFAULT_RX_BUFFER_SIZE,
        }
    }
}

impl UartConfig {
    /// Default configuration with no pins
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transmit pin
    pub fn tx(mut self, pin: Pin) -> Self {
        self.tx = Some(pin);
        self
    }

    /// Set the receive pin
    pub fn rx(mut self, pin: Pin) -> Self {
        self.rx = Some(pin);
        self
    }

    /// Enable RTS flow control on `pin`
    pub fn rts(mut self, pin: Pin) -> Self {
        self.rts = Some(pin);
        self
    }

    /// Enable CTS flow control on `pin`
    pub fn cts(mut self, pin: Pin) -> Self {
        self.cts = Some(pin);
        self
    }

    /// Use `pin` as the RS-485 transmit enable output
    pub fn rs485_dir(mut self, pin: Pin, invert: bool) -> Self {
        self.rs485_dir = Some(pin);
        self.rs485_invert = invert;
        self
    }

    /// Set the baud rate
    pub fn baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = baudrate;
        self
    }

    /// Set the data bits per character
    pub fn bits(mut self, bits: u8) -> Self {
        self.bits = bits;
        self
    }

    /// Set the parity mode
    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Set the number of stop bits
    pub fn stop(mut self, stop: u8) -> Self {
        self.stop = stop;
        self
    }

    /// Set the read timeout in seconds
    pub fn timeout(mut self, timeout: f32) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the receive buffer capacity in characters
    pub fn receiver_buffer_size(mut self, size: usize) -> Self {
        self.receiver_buffer_size = size;
        self
    }

    /// Pins requested by this configuration, in claim order
    pub fn pins(&self) -> impl Iterator<Item = Pin> {
        [self.tx, self.rx, self.rts, self.cts, self.rs485_dir]
            .into_iter()
            .flatten()
    }

    /// Check every value domain
    ///
    /// Pin availability is checked separately, when claiming.
    pub fn validate(&self) -> Result {
        if self.tx.is_none() && self.rx.is_none() {
            return Err(ConfigError::NoPins.into());
        }
        if !(7..=9).contains(&self.bits) {
            return Err(ConfigError::InvalidBits(self.bits).into());
        }
        if self.stop != 1 && self.stop != 2 {
            return Err(ConfigError::InvalidStop(self.stop).into());
        }
        validate_timeout(self.timeout)?;
        validate_baudrate(self.baudrate)
    }

    /// Override fields from `<prefix>.<field>` boot arguments
    ///
    /// # Arguments
    ///
    /// * `args` - Parsed boot arguments
    /// * `prefix` - Key prefix, e.g. `"uart0"`
    ///
    /// # Errors
    ///
    /// `InvalidValue` / `InvalidParity` for malformed values. Ranges are
    /// checked later by [`validate`](Self::validate).
    pub fn apply_cmdline(mut self, args: &Cmdline<'_>, prefix: &str) -> Result<Self> {
        let key = |field: &str| format!("{}.{}", prefix, field);

        self.baudrate = args.get_u32(&key("baudrate"), self.baudrate)?;
        self.bits = narrow(args.get_u32(&key("bits"), self.bits as u32)?, "bits")?;
        self.stop = narrow(args.get_u32(&key("stop"), self.stop as u32)?, "stop")?;
        self.timeout = args.get_f32(&key("timeout"), self.timeout)?;
        self.receiver_buffer_size =
            args.get_u32(&key("rxbuf"), self.receiver_buffer_size as u32)? as usize;
        self.rs485_invert = args.get_bool(&key("rs485_invert"), self.rs485_invert);

        if let Some(name) = args.get(&key("parity")) {
            self.parity = Parity::from_name(name).ok_or(ConfigError::InvalidParity)?;
        }

        self.tx = pin_arg(args, &key("tx"), self.tx)?;
        self.rx = pin_arg(args, &key("rx"), self.rx)?;
        self.rts = pin_arg(args, &key("rts"), self.rts)?;
        self.cts = pin_arg(args, &key("cts"), self.cts)?;
        self.rs485_dir = pin_arg(args, &key("rs485_dir"), self.rs485_dir)?;

        Ok(self)
    }
}

/// Check a timeout in seconds
pub fn validate_timeout(timeout: f32) -> Result {
    if (0.0..=MAX_TIMEOUT).contains(&timeout) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimeout.into())
    }
}

/// Check a baud rate
pub fn validate_baudrate(baudrate: u32) -> Result {
    if baudrate == 0 {
        return Err(ConfigError::InvalidBaudrate(baudrate).into());
    }
    Ok(())
}

fn narrow(value: u32, field: &'static str) -> Result<u8> {
    u8::try_from(value).map_err(|_| ConfigError::InvalidValue(field).into())
}

fn pin_arg(args: &Cmdline<'_>, key: &str, current: Option<Pin>) -> Result<Option<Pin>> {
    if args.get(key).is_none() {
        return Ok(current);
    }
    let number = args.get_u32(key, 0)?;
    let number = u16::try_from(number).map_err(|_| ConfigError::InvalidValue("pin"))?;
    Ok(Some(Pin::from_number(number)))
}
