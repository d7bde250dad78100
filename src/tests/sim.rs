// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Simulated Hardware
//!
//! - [`SimPlatform`]: a clock that advances a fixed step on every background
//!   tick, with hooks that run on each tick (to deliver data mid-wait) and a
//!   programmable console interrupt
//! - [`LoopbackHardware`]: a [`UartHardware`] whose transmitter can feed its
//!   own receiver, with knobs for stalls, CTS and failures
//! - [`SimPl011Regs`]: a PL011 register file for the real driver

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

use crate::cbuf::RxSink;
use crate::dev::uart::pl011::*;
use crate::dev::uart::{LineConfig, UartHardware};
use crate::err::{Error, Result};
use crate::pin::{Pin, PinRegistry};
use crate::platform::Platform;

pub const TX: Pin = Pin::new(0, "TX");
pub const RX: Pin = Pin::new(1, "RX");
pub const RTS: Pin = Pin::new(2, "RTS");
pub const CTS: Pin = Pin::new(3, "CTS");
pub const DE: Pin = Pin::new(4, "DE");

pub fn registry() -> Arc<PinRegistry> {
    Arc::new(PinRegistry::new(32))
}

// ============================================================================
// Platform
// ============================================================================

type Hook = Box<dyn FnMut(u64) + Send>;

/// Simulated clock and console
pub struct SimPlatform {
    now: AtomicU64,
    step_ms: u64,
    ticks: AtomicU64,
    interrupt_at: AtomicU64,
    hooks: Mutex<Vec<Hook>>,
}

impl SimPlatform {
    /// Clock at 0 ms advancing 1 ms per background tick
    pub fn new() -> Arc<Self> {
        Self::with_step(1)
    }

    pub fn with_step(step_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(0),
            step_ms,
            ticks: AtomicU64::new(0),
            interrupt_at: AtomicU64::new(u64::MAX),
            hooks: Mutex::new(Vec::new()),
        })
    }

    /// Raise the console interrupt once the clock reaches `ms`
    pub fn interrupt_at(&self, ms: u64) {
        self.interrupt_at.store(ms, Ordering::SeqCst);
    }

    /// Run `hook(now)` on every background tick
    pub fn on_tick(&self, hook: impl FnMut(u64) + Send + 'static) {
        self.hooks.lock().push(Box::new(hook));
    }

    pub fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Platform for SimPlatform {
    fn ticks_ms(&self) -> u64 {
        self.now()
    }

    fn run_background_tasks(&self) {
        let now = self.now.fetch_add(self.step_ms, Ordering::SeqCst) + self.step_ms;
        self.ticks.fetch_add(1, Ordering::SeqCst);
        for hook in self.hooks.lock().iter_mut() {
            hook(now);
        }
    }

    fn is_interrupted(&self) -> bool {
        self.now() >= self.interrupt_at.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Loopback UART
// ============================================================================

/// Observable state of a [`LoopbackHardware`]
#[derive(Default)]
pub struct LoopState {
    pub config: Option<LineConfig>,
    pub baudrate: u32,
    pub sink: Option<RxSink>,
    /// Receive FIFO used when no sink is installed
    pub fifo: VecDeque<u16>,
    /// Every transmitted character
    pub sent: Vec<u16>,
    /// Direction level seen by each transmitted character
    pub sent_dir: Vec<Option<bool>>,
    /// Every `set_direction` call, in order
    pub dir_log: Vec<bool>,
    pub dir: Option<bool>,
    /// Echo transmitted characters into the receiver
    pub loopback: bool,
    /// Characters the transmitter still accepts (`None` = unlimited)
    pub tx_budget: Option<usize>,
    pub cts_blocked: bool,
    /// `tx_idle` reports busy this many more times
    pub busy_polls: usize,
    /// The line refills the FIFO as fast as it is read
    pub endless_rx: bool,
    pub fail_configure: Option<Error>,
    pub resumes: usize,
    pub deinit_calls: usize,
}

impl LoopState {
    /// Deliver a received character as the interrupt handler would
    pub fn deliver(&mut self, word: u16) {
        match &self.sink {
            Some(sink) => {
                sink.push(word);
            }
            None => self.fifo.push_back(word),
        }
    }
}

/// Loopback peripheral
#[derive(Clone, Default)]
pub struct LoopbackHardware {
    state: Arc<Mutex<LoopState>>,
}

impl LoopbackHardware {
    /// Peripheral that echoes its output
    pub fn looped() -> Self {
        let hw = Self::default();
        hw.state.lock().loopback = true;
        hw
    }

    /// Shared state, usable after the hardware moved into a device
    pub fn state(&self) -> Arc<Mutex<LoopState>> {
        self.state.clone()
    }

    /// Deliver bytes to the receiver
    pub fn inject(&self, data: &[u8]) {
        let mut state = self.state.lock();
        for &b in data {
            state.deliver(b as u16);
        }
    }
}

impl UartHardware for LoopbackHardware {
    fn configure(&mut self, config: &LineConfig) -> Result {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_configure {
            return Err(err);
        }
        state.config = Some(*config);
        state.baudrate = config.baudrate;
        Ok(())
    }

    fn set_baudrate(&mut self, baudrate: u32) -> Result {
        self.state.lock().baudrate = baudrate;
        Ok(())
    }

    fn enable_rx(&mut self, sink: RxSink) -> Result {
        self.state.lock().sink = Some(sink);
        Ok(())
    }

    fn disable_rx(&mut self) {
        self.state.lock().sink = None;
    }

    fn rx_resume(&mut self) {
        self.state.lock().resumes += 1;
    }

    fn rx_pending(&self) -> usize {
        self.state.lock().fifo.len()
    }

    fn read_word(&mut self) -> Option<u16> {
        let mut state = self.state.lock();
        let word = state.fifo.pop_front()?;
        if state.endless_rx {
            state.fifo.push_back(word);
        }
        Some(word)
    }

    fn tx_ready(&self) -> bool {
        self.state.lock().tx_budget != Some(0)
    }

    fn write_word(&mut self, word: u16) {
        let mut state = self.state.lock();
        if let Some(budget) = state.tx_budget.as_mut() {
            *budget -= 1;
        }
        let dir = state.dir;
        state.sent.push(word);
        state.sent_dir.push(dir);
        if state.loopback {
            state.deliver(word);
        }
    }

    fn tx_idle(&self) -> bool {
        let mut state = self.state.lock();
        if state.busy_polls > 0 {
            state.busy_polls -= 1;
            return false;
        }
        true
    }

    fn clear_to_send(&self) -> bool {
        !self.state.lock().cts_blocked
    }

    fn set_direction(&mut self, high: bool) {
        let mut state = self.state.lock();
        state.dir = Some(high);
        state.dir_log.push(high);
    }

    fn deinit(&mut self) {
        let mut state = self.state.lock();
        state.deinit_calls += 1;
        state.sink = None;
    }
}

// ============================================================================
// PL011 register file
// ============================================================================

/// PL011 receive FIFO depth
pub const PL011_FIFO_DEPTH: usize = 32;

#[derive(Default)]
pub struct Pl011State {
    pub regs: [u32; 0x48 / 4],
    /// Receive FIFO entries as DR would return them
    pub rx: VecDeque<u32>,
    pub tx: Vec<u8>,
    pub icr_writes: Vec<u32>,
    overflowed: bool,
}

impl Pl011State {
    pub fn reg(&self, offset: usize) -> u32 {
        self.regs[offset / 4]
    }

    fn push_rx(&mut self, byte: u8) {
        if self.rx.len() >= PL011_FIFO_DEPTH {
            self.overflowed = true;
            return;
        }
        let mut entry = byte as u32;
        if core::mem::take(&mut self.overflowed) {
            entry |= DR_OE;
        }
        self.rx.push_back(entry);
    }

    fn raw_status(&self) -> u32 {
        if self.rx.is_empty() {
            0
        } else {
            IMSC_RX | IMSC_RT
        }
    }
}

/// Simulated PL011 register window
#[derive(Clone, Default)]
pub struct SimPl011Regs {
    state: Arc<Mutex<Pl011State>>,
}

impl SimPl011Regs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> spin::MutexGuard<'_, Pl011State> {
        self.state.lock()
    }

    /// Characters arriving on the RX line
    pub fn inject(&self, data: &[u8]) {
        let mut state = self.state.lock();
        for &b in data {
            state.push_rx(b);
        }
    }
}

impl Pl011Regs for SimPl011Regs {
    fn read(&self, offset: usize) -> u32 {
        let mut state = self.state.lock();
        match offset {
            UART_DR => state.rx.pop_front().unwrap_or(0),
            UART_FR => {
                let mut fr = FR_TXFE;
                if state.rx.is_empty() {
                    fr |= FR_RXFE;
                }
                if state.rx.len() >= PL011_FIFO_DEPTH {
                    fr |= FR_RXFF;
                }
                fr
            }
            UART_RIS => state.raw_status(),
            UART_MIS => state.raw_status() & state.reg(UART_IMSC),
            _ => state.reg(offset),
        }
    }

    fn write(&self, offset: usize, value: u32) {
        let mut state = self.state.lock();
        match offset {
            UART_DR => {
                let byte = (value & DR_DATA_MASK) as u8;
                state.tx.push(byte);
                if state.reg(UART_CR) & CR_LBE != 0 {
                    state.push_rx(byte);
                }
            }
            UART_ICR => state.icr_writes.push(value),
            _ => state.regs[offset / 4] = value,
        }
    }
}
