// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! UART Devices
//!
//! A [`Uart`] is one configured serial channel. It owns its pin claims, its
//! receive ring buffer and a peripheral driver implementing
//! [`UartHardware`].
//!
//! # Design
//!
//! - **Receive path**: the driver's interrupt handler pushes characters into
//!   the ring buffer through an [`RxSink`]; [`Uart::read`] drains it. With a
//!   zero-sized buffer no interrupt is installed and reads poll the
//!   peripheral FIFO instead.
//! - **Timeouts**: reads wait until the caller's buffer is full or `timeout`
//!   seconds pass without a new character. Writes give up after `timeout`
//!   seconds without progress.
//! - **Waiting**: every wait iteration runs background tasks and honours the
//!   console interrupt.
//! - **Teardown**: [`Uart::deinit`] is idempotent and also runs on drop and
//!   at the end of a [`UartSession`].
//!
//! # Supported Peripherals
//!
//! - **PL011**: ARM PrimeCell PL011 UART ([`pl011`])
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = UartConfig::new().tx(TX).rx(RX).baudrate(115_200).timeout(0.5);
//! let mut uart = Uart::construct(hw, &registry, platform, config)?;
//!
//! uart.write(b"AT\r\n")?;
//! match uart.read(&mut reply) {
//!     Ok(n) => handle(&reply[..n]),
//!     Err(Error::ShouldWait) => no_reply(),
//!     Err(e) => return Err(e),
//! }
//! ```

pub mod config;
pub mod hw;
pub mod pl011;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::cbuf::{RingBuffer, RxSink};
use crate::err::{Error, Result};
use crate::pin::{Pin, PinRegistry};
use crate::platform::{self, Deadline, Platform};
use crate::stream::{IoctlRequest, PollFlags, Stream, StreamProperties};

pub use config::{Parity, UartConfig};
pub use hw::{LineConfig, UartHardware};

const LOCAL_TRACE: bool = false;

/// Characters the deinit drain allows for: a deep transmit FIFO plus the
/// shift register
const TX_DRAIN_CHARS: u64 = 64;

/// Added to the deinit drain for clock granularity
const TX_DRAIN_SLACK_MS: u64 = 10;

/// Serial channel
pub struct Uart<H: UartHardware> {
    hw: H,
    registry: Arc<PinRegistry>,
    platform: Arc<dyn Platform>,
    /// Pins claimed at construction, released at deinit
    pins: Vec<Pin>,
    rx_buf: Option<Arc<RingBuffer>>,
    has_tx: bool,
    has_rx: bool,
    rs485: bool,
    rs485_invert: bool,
    baudrate: u32,
    bits: u8,
    parity: Parity,
    stop: u8,
    timeout: f32,
    deinited: bool,
}

impl<H: UartHardware> Uart<H> {
    /// Construct a UART
    ///
    /// Validates `config`, claims its pins, programs the peripheral and
    /// installs the receive path.
    ///
    /// # Arguments
    ///
    /// * `hw` - Peripheral driver, not yet configured
    /// * `registry` - Pin ownership registry shared by every device
    /// * `platform` - Clock and background services
    /// * `config` - Construction parameters
    ///
    /// # Errors
    ///
    /// - `Config(..)` for invalid values or pins already in use; nothing is
    ///   claimed in that case
    /// - `NoMemory` if the receive buffer cannot be allocated; nothing is
    ///   claimed
    /// - Whatever the driver reports; pins claimed by this call are released
    pub fn construct(
        mut hw: H,
        registry: &Arc<PinRegistry>,
        platform: Arc<dyn Platform>,
        config: UartConfig,
    ) -> Result<Self> {
        config.validate()?;

        let rx_buf = if config.rx.is_some() && config.receiver_buffer_size > 0 {
            Some(Arc::new(RingBuffer::new(config.receiver_buffer_size, config.bits)?))
        } else {
            None
        };

        let pins: Vec<Pin> = config.pins().collect();
        registry.claim_all(&pins)?;

        let line = LineConfig {
            baudrate: config.baudrate,
            bits: config.bits,
            parity: config.parity,
            stop: config.stop,
            tx: config.tx.is_some(),
            rx: config.rx.is_some(),
            rts: config.rts.is_some(),
            cts: config.cts.is_some(),
            rs485: config.rs485_dir.is_some(),
        };

        if let Err(err) = hw.configure(&line) {
            log_error!("UART: peripheral rejected configuration: {}", err);
            registry.release_all(&pins);
            return Err(err);
        }

        if let Some(buf) = &rx_buf {
            if let Err(err) = hw.enable_rx(RxSink::new(buf.clone())) {
                log_error!("UART: failed to install receive path: {}", err);
                hw.deinit();
                registry.release_all(&pins);
                return Err(err);
            }
        }

        let mut uart = Self {
            hw,
            registry: registry.clone(),
            platform,
            pins,
            rx_buf,
            has_tx: line.tx,
            has_rx: line.rx,
            rs485: line.rs485,
            rs485_invert: config.rs485_invert,
            baudrate: config.baudrate,
            bits: config.bits,
            parity: config.parity,
            stop: config.stop,
            timeout: config.timeout,
            deinited: false,
        };
        uart.set_receive_direction();

        log_info!(
            "UART: {} baud {}{}{} rxbuf={} pins={:?}",
            uart.baudrate,
            uart.bits,
            parity_letter(uart.parity),
            uart.stop,
            config.receiver_buffer_size,
            uart.pins
        );

        Ok(uart)
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Whether [`deinit`](Self::deinit) has run
    #[inline]
    pub fn deinited(&self) -> bool {
        self.deinited
    }

    #[inline]
    fn check_for_deinit(&self) -> Result {
        if self.deinited {
            return Err(Error::Deinitialized);
        }
        Ok(())
    }

    /// Bytes per character in caller buffers
    #[inline]
    fn char_width(&self) -> usize {
        RingBuffer::width_for_bits(self.bits)
    }

    /// Bits per character
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Parity mode
    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Stop bits
    pub fn stop(&self) -> u8 {
        self.stop
    }

    /// Receive buffer, if buffering is enabled
    pub fn rx_buffer(&self) -> Option<&RingBuffer> {
        self.rx_buf.as_deref()
    }

    /// Access the peripheral driver
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Mutable access to the peripheral driver
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Current baud rate
    pub fn baudrate(&self) -> Result<u32> {
        self.check_for_deinit()?;
        Ok(self.baudrate)
    }

    /// Change the baud rate
    ///
    /// Buffered data is kept.
    pub fn set_baudrate(&mut self, baudrate: u32) -> Result {
        self.check_for_deinit()?;
        config::validate_baudrate(baudrate)?;
        self.hw.set_baudrate(baudrate)?;
        log_debug!("UART: baudrate {} -> {}", self.baudrate, baudrate);
        self.baudrate = baudrate;
        Ok(())
    }

    /// Current timeout in seconds
    pub fn timeout(&self) -> Result<f32> {
        self.check_for_deinit()?;
        Ok(self.timeout)
    }

    /// Change the timeout
    ///
    /// # Errors
    ///
    /// `Config(InvalidTimeout)` outside 0.0 to 100.0 seconds
    pub fn set_timeout(&mut self, timeout: f32) -> Result {
        self.check_for_deinit()?;
        config::validate_timeout(timeout)?;
        self.timeout = timeout;
        Ok(())
    }

    /// Characters received but not yet read
    ///
    /// 9-bit characters count once. Without a receive buffer this is the
    /// peripheral FIFO level.
    pub fn in_waiting(&self) -> Result<usize> {
        self.check_for_deinit()?;
        Ok(self.rx_available())
    }

    fn rx_available(&self) -> usize {
        match &self.rx_buf {
            Some(buf) => buf.available(),
            None if self.has_rx => self.hw.rx_pending(),
            None => 0,
        }
    }

    /// Discard every buffered, unread character
    pub fn reset_input_buffer(&mut self) -> Result {
        self.check_for_deinit()?;
        match &self.rx_buf {
            Some(buf) => buf.clear(),
            None if self.has_rx => {
                // One FIFO's worth; a busy line keeps refilling it
                for _ in 0..self.hw.rx_pending() {
                    if self.hw.read_word().is_none() {
                        break;
                    }
                }
            }
            None => {}
        }
        self.hw.rx_resume();
        Ok(())
    }

    /// Characters dropped because the receive buffer was full
    pub fn overrun_count(&self) -> Result<usize> {
        self.check_for_deinit()?;
        Ok(self.dropped())
    }

    /// Reset the overrun counter, returning its last value
    pub fn clear_overrun(&mut self) -> Result<usize> {
        self.check_for_deinit()?;
        let dropped = self.rx_buf.as_ref().map_or(0, |buf| buf.take_overruns());
        if dropped > 0 {
            log_warn!("UART: {} received characters dropped", dropped);
        }
        Ok(dropped)
    }

    fn dropped(&self) -> usize {
        self.rx_buf.as_ref().map_or(0, |buf| buf.overruns())
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// Read received characters into `buf`
    ///
    /// Waits until `buf` holds as many whole characters as fit, or `timeout`
    /// seconds pass without a new character. The timer restarts on every
    /// received character.
    ///
    /// # Returns
    ///
    /// Number of bytes copied. 9-bit characters take two little-endian bytes.
    ///
    /// # Errors
    ///
    /// - `ShouldWait` if no character arrived before the timeout
    /// - `Canceled` if the console interrupt fired while waiting
    /// - `InvalidArgs` if `buf` is shorter than one character
    /// - `NotSupported` if the UART has no RX pin
    /// - `Deinitialized` after [`deinit`](Self::deinit)
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_for_deinit()?;
        if !self.has_rx {
            return Err(Error::NotSupported);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let width = self.char_width();
        if buf.len() < width {
            return Err(Error::InvalidArgs);
        }
        let want = buf.len() - buf.len() % width;

        let platform = self.platform.clone();
        let mut deadline = Deadline::start(platform.as_ref(), platform::timeout_to_ms(self.timeout));
        let mut copied = 0;

        loop {
            let n = self.take_chars(&mut buf[copied..want]);
            if n > 0 {
                copied += n;
                deadline.restart(platform.as_ref());
            }
            if copied == want || deadline.expired(platform.as_ref()) {
                break;
            }
            platform::wait_step(platform.as_ref())?;
        }

        log_trace_if!(LOCAL_TRACE, "UART: read {} of {} bytes", copied, want);

        if copied == 0 {
            return Err(Error::ShouldWait);
        }
        Ok(copied)
    }

    /// Move available characters into `out` without waiting
    fn take_chars(&mut self, out: &mut [u8]) -> usize {
        match &self.rx_buf {
            Some(buf) => {
                let n = buf.pop(out);
                if n > 0 {
                    self.hw.rx_resume();
                }
                n
            }
            None => {
                let width = self.char_width();
                let mut n = 0;
                while n + width <= out.len() {
                    let Some(word) = self.hw.read_word() else {
                        break;
                    };
                    let bytes = word.to_le_bytes();
                    out[n..n + width].copy_from_slice(&bytes[..width]);
                    n += width;
                }
                n
            }
        }
    }

    // ========================================================================
    // Write
    // ========================================================================

    /// Transmit `data`
    ///
    /// With 9-bit characters `data` is a sequence of little-endian pairs.
    /// When an RS-485 direction pin is configured it is driven to the
    /// transmit level for the duration of the call, including the wait for
    /// the last character to leave the shift register.
    ///
    /// # Returns
    ///
    /// Bytes accepted. Short if the transmitter stalled for `timeout`
    /// seconds.
    ///
    /// # Errors
    ///
    /// - `ShouldWait` if nothing could be sent before the timeout
    /// - `Canceled` if the console interrupt fired while waiting
    /// - `InvalidArgs` for an odd byte count with 9-bit characters
    /// - `NotSupported` if the UART has no TX pin
    /// - `Deinitialized` after [`deinit`](Self::deinit)
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.check_for_deinit()?;
        if !self.has_tx {
            return Err(Error::NotSupported);
        }

        let width = self.char_width();
        if data.len() % width != 0 {
            return Err(Error::InvalidArgs);
        }
        if data.is_empty() {
            return Ok(0);
        }

        if self.rs485 {
            self.hw.set_direction(!self.rs485_invert);
        }

        let result = self.write_chars(data, width);

        if self.rs485 {
            // Keep driving until the final stop bit is out
            let drained = self.wait_tx_idle(None, true);
            self.set_receive_direction();
            if result.is_ok() && drained == Err(Error::Canceled) {
                return Err(Error::Canceled);
            }
        }

        result
    }

    fn write_chars(&mut self, data: &[u8], width: usize) -> Result<usize> {
        let platform = self.platform.clone();
        let mut deadline = Deadline::start(platform.as_ref(), platform::timeout_to_ms(self.timeout));
        let mut written = 0;

        for chunk in data.chunks_exact(width) {
            let word = if width == 2 {
                u16::from_le_bytes([chunk[0], chunk[1]])
            } else {
                chunk[0] as u16
            };

            while !(self.hw.tx_ready() && self.hw.clear_to_send()) {
                if deadline.expired(platform.as_ref()) {
                    log_debug!("UART: transmitter stalled after {} bytes", written);
                    return if written == 0 {
                        Err(Error::ShouldWait)
                    } else {
                        Ok(written)
                    };
                }
                platform::wait_step(platform.as_ref())?;
            }

            self.hw.write_word(word);
            written += width;
            deadline.restart(platform.as_ref());
        }

        Ok(written)
    }

    /// Wait until the transmitter is idle
    ///
    /// `limit_ms` of `None` waits for as long as the transmitter is busy.
    ///
    /// # Returns
    ///
    /// `Ok(true)` once idle, `Ok(false)` when `limit_ms` passed first
    fn wait_tx_idle(&mut self, limit_ms: Option<u64>, interruptible: bool) -> Result<bool> {
        let platform = self.platform.clone();
        let deadline = limit_ms.map(|ms| Deadline::start(platform.as_ref(), ms));

        while !self.hw.tx_idle() {
            if deadline.as_ref().is_some_and(|d| d.expired(platform.as_ref())) {
                return Ok(false);
            }
            if interruptible {
                platform::wait_step(platform.as_ref())?;
            } else {
                platform.run_background_tasks();
            }
        }
        Ok(true)
    }

    /// Time for a full transmit FIFO plus the shift register to clock out
    fn drain_limit_ms(&self) -> u64 {
        let parity_bits = if self.parity == Parity::None { 0 } else { 1 };
        let frame_bits = 1 + self.bits as u64 + parity_bits + self.stop as u64;
        let bits = TX_DRAIN_CHARS * frame_bits * 1000;
        bits.div_ceil(self.baudrate.max(1) as u64) + TX_DRAIN_SLACK_MS
    }

    fn set_receive_direction(&mut self) {
        if self.rs485 {
            self.hw.set_direction(self.rs485_invert);
        }
    }

    /// Wait for every queued character to be transmitted
    ///
    /// # Errors
    ///
    /// `ShouldWait` if the transmitter is still busy after `timeout` seconds
    pub fn flush(&mut self) -> Result {
        self.check_for_deinit()?;
        if !self.has_tx {
            return Ok(());
        }
        let limit = platform::timeout_to_ms(self.timeout);
        if self.wait_tx_idle(Some(limit), true)? {
            Ok(())
        } else {
            Err(Error::ShouldWait)
        }
    }

    // ========================================================================
    // Poll / ioctl
    // ========================================================================

    /// Report readiness for the requested events without waiting
    pub fn poll(&self, requested: PollFlags) -> Result<PollFlags> {
        self.check_for_deinit()?;
        let mut ready = PollFlags::empty();

        if requested.contains(PollFlags::RD) && self.rx_available() > 0 {
            ready |= PollFlags::RD;
        }
        if requested.contains(PollFlags::WR)
            && self.has_tx
            && self.hw.tx_ready()
            && self.hw.clear_to_send()
        {
            ready |= PollFlags::WR;
        }

        Ok(ready)
    }

    /// Stream control request
    ///
    /// # Errors
    ///
    /// `InvalidArgs` for anything but `Poll` and `Flush`
    pub fn ioctl(&mut self, request: IoctlRequest) -> Result<usize> {
        self.check_for_deinit()?;
        match request {
            IoctlRequest::Poll(flags) => Ok(self.poll(flags)?.bits() as usize),
            IoctlRequest::Flush => self.flush().map(|_| 0),
            IoctlRequest::Other(code) => {
                log_trace_if!(LOCAL_TRACE, "UART: unsupported ioctl {:#x}", code);
                Err(Error::InvalidArgs)
            }
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Shut the UART down and release its pins
    ///
    /// Later calls are no-ops.
    pub fn deinit(&mut self) {
        if self.deinited {
            return;
        }

        self.hw.disable_rx();
        let limit = self.drain_limit_ms();
        if self.has_tx && !matches!(self.wait_tx_idle(Some(limit), false), Ok(true)) {
            log_warn!("UART: transmitter still busy at deinit");
        }
        self.set_receive_direction();
        self.hw.deinit();

        let dropped = self.dropped();
        if dropped > 0 {
            log_warn!("UART: {} received characters dropped", dropped);
        }

        self.registry.release_all(&self.pins);
        self.pins.clear();
        self.rx_buf = None;
        self.deinited = true;

        log_info!("UART: deinitialized");
    }

    /// Begin a session that deinitializes the UART when it ends
    pub fn enter(&mut self) -> UartSession<'_, H> {
        UartSession { uart: self }
    }

    /// Run `f` with the UART, then deinitialize it
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let mut session = self.enter();
        f(&mut *session)
    }
}

impl<H: UartHardware> Drop for Uart<H> {
    fn drop(&mut self) {
        self.deinit();
    }
}

impl<H: UartHardware> fmt::Debug for Uart<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uart")
            .field("baudrate", &self.baudrate)
            .field("bits", &self.bits)
            .field("parity", &self.parity)
            .field("stop", &self.stop)
            .field("timeout", &self.timeout)
            .field("pins", &self.pins)
            .field("deinited", &self.deinited)
            .finish()
    }
}

impl<H: UartHardware> Stream for Uart<H> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Uart::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Uart::write(self, buf)
    }

    fn ioctl(&mut self, request: IoctlRequest) -> Result<usize> {
        Uart::ioctl(self, request)
    }

    fn properties(&self) -> StreamProperties {
        StreamProperties {
            is_text: false,
            pyserial_compatibility: true,
        }
    }
}

fn parity_letter(parity: Parity) -> char {
    match parity {
        Parity::None => 'N',
        Parity::Even => 'E',
        Parity::Odd => 'O',
    }
}

/// Scoped use of a [`Uart`]
///
/// Derefs to the device; dropping the session deinitializes it.
pub struct UartSession<'a, H: UartHardware> {
    uart: &'a mut Uart<H>,
}

impl<H: UartHardware> Deref for UartSession<'_, H> {
    type Target = Uart<H>;

    fn deref(&self) -> &Uart<H> {
        self.uart
    }
}

impl<H: UartHardware> DerefMut for UartSession<'_, H> {
    fn deref_mut(&mut self) -> &mut Uart<H> {
        self.uart
    }
}

impl<H: UartHardware> Drop for UartSession<'_, H> {
    fn drop(&mut self) {
        self.uart.deinit();
    }
}
