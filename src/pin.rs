// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Pin Ownership Registry
//!
//! Tracks which hardware pins are claimed by a live device. The registry is
//! an explicit object handed to device construction rather than hidden global
//! state; claim and release are its only mutating operations.
//!
//! # Design
//!
//! - One bit per pin number, stored in 64-bit words
//! - Multi-pin claims are all-or-nothing under a single lock
//! - A pin can be held by exactly one device at a time

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};
use spin::Mutex;

use crate::err::{ConfigError, Result};

/// Bits per bitmap word
const BITS_PER_WORD: usize = u64::BITS as usize;

/// Hardware pin identifier
///
/// Pins compare by number; the name is only used for messages.
#[derive(Clone, Copy)]
pub struct Pin {
    number: u16,
    name: &'static str,
}

impl Pin {
    /// Create a pin descriptor
    pub const fn new(number: u16, name: &'static str) -> Self {
        Self { number, name }
    }

    /// Create an unnamed pin descriptor
    pub const fn from_number(number: u16) -> Self {
        Self { number, name: "" }
    }

    /// Pin number
    #[inline]
    pub const fn number(&self) -> u16 {
        self.number
    }

    /// Pin name (may be empty)
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Pin {}

impl Hash for Pin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin({}", self.number)?;
        if !self.name.is_empty() {
            write!(f, " {}", self.name)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "GPIO{}", self.number)
        } else {
            f.write_str(self.name)
        }
    }
}

/// Exclusive pin ownership table
pub struct PinRegistry {
    pin_count: usize,
    claimed: Mutex<Vec<u64>>,
}

impl PinRegistry {
    /// Create a registry for pins `0..pin_count`
    pub fn new(pin_count: usize) -> Self {
        let words = (pin_count + BITS_PER_WORD - 1) / BITS_PER_WORD;
        Self {
            pin_count,
            claimed: Mutex::new(vec![0u64; words]),
        }
    }

    /// Number of pins managed by this registry
    pub fn pin_count(&self) -> usize {
        self.pin_count
    }

    #[inline]
    fn slot(pin: Pin) -> (usize, u64) {
        let n = pin.number as usize;
        (n / BITS_PER_WORD, 1u64 << (n % BITS_PER_WORD))
    }

    fn check(&self, pin: Pin) -> Result<()> {
        if pin.number as usize >= self.pin_count {
            return Err(ConfigError::InvalidPin(pin).into());
        }
        Ok(())
    }

    /// Check whether a pin is currently claimed
    pub fn is_claimed(&self, pin: Pin) -> bool {
        if self.check(pin).is_err() {
            return false;
        }
        let (word, bit) = Self::slot(pin);
        self.claimed.lock()[word] & bit != 0
    }

    /// Verify a pin is free without claiming it
    pub fn assert_free(&self, pin: Pin) -> Result<()> {
        self.check(pin)?;
        if self.is_claimed(pin) {
            return Err(ConfigError::PinInUse(pin).into());
        }
        Ok(())
    }

    /// Claim a single pin
    pub fn claim(&self, pin: Pin) -> Result<()> {
        self.claim_all(&[pin])
    }

    /// Claim every pin in `pins`, or none of them
    ///
    /// # Errors
    ///
    /// - `InvalidPin` if a number is outside the registry
    /// - `DuplicatePin` if the same pin appears twice
    /// - `PinInUse` if a pin is already claimed
    pub fn claim_all(&self, pins: &[Pin]) -> Result<()> {
        for (i, &pin) in pins.iter().enumerate() {
            self.check(pin)?;
            if pins[..i].contains(&pin) {
                return Err(ConfigError::DuplicatePin(pin).into());
            }
        }

        let mut claimed = self.claimed.lock();

        if let Some(&busy) = pins.iter().find(|&&pin| {
            let (word, bit) = Self::slot(pin);
            claimed[word] & bit != 0
        }) {
            log_debug!("pin: {} already claimed", busy);
            return Err(ConfigError::PinInUse(busy).into());
        }

        for &pin in pins {
            let (word, bit) = Self::slot(pin);
            claimed[word] |= bit;
        }

        Ok(())
    }

    /// Release a pin. Releasing a free or unknown pin is a no-op.
    pub fn release(&self, pin: Pin) {
        if self.check(pin).is_err() {
            return;
        }
        let (word, bit) = Self::slot(pin);
        self.claimed.lock()[word] &= !bit;
    }

    /// Release every pin in `pins`
    pub fn release_all(&self, pins: &[Pin]) {
        let mut claimed = self.claimed.lock();
        for &pin in pins {
            if (pin.number as usize) < self.pin_count {
                let (word, bit) = Self::slot(pin);
                claimed[word] &= !bit;
            }
        }
    }

    /// Number of pins currently claimed
    pub fn claimed_count(&self) -> usize {
        self.claimed
            .lock()
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }
}

impl fmt::Debug for PinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinRegistry")
            .field("pin_count", &self.pin_count)
            .field("claimed", &self.claimed_count())
            .finish()
    }
}
