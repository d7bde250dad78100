// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Circular Receive Buffer
//!
//! This module provides the fixed-capacity character queue that sits between
//! a UART receive interrupt (the single producer) and application reads (the
//! single consumer).
//!
//! # Design
//!
//! - **Free-running counters**: `head` counts characters ever pushed, `tail`
//!   characters ever popped. `head - tail` is the fill level, so a full
//!   buffer needs no sacrificial slot.
//! - **Single writer per index**: only the producer stores `head`, only the
//!   consumer stores `tail`. Stores are `Release`, the opposing loads are
//!   `Acquire`, so neither side ever observes a half-written character.
//! - **Character width**: 9-bit characters occupy two bytes of storage,
//!   little-endian. Counts are always in characters.
//! - **Overrun**: when full, the newest character is dropped and counted.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::err::{Error, Result};

/// Receive ring buffer
pub struct RingBuffer {
    /// Backing storage, `capacity * width` bytes
    buf: Box<[AtomicU8]>,
    /// Capacity in characters
    capacity: usize,
    /// Bytes per character (1 or 2)
    width: usize,
    /// Characters pushed (producer owned)
    head: AtomicUsize,
    /// Characters popped (consumer owned)
    tail: AtomicUsize,
    /// Characters dropped because the buffer was full
    overruns: AtomicUsize,
}

impl RingBuffer {
    /// Create a buffer holding `capacity` characters of `bits` bits each
    ///
    /// Characters wider than 8 bits take two bytes of storage.
    ///
    /// # Errors
    ///
    /// `NoMemory` if the storage size overflows or cannot be allocated
    pub fn new(capacity: usize, bits: u8) -> Result<Self> {
        let width = Self::width_for_bits(bits);
        let len = capacity.checked_mul(width).ok_or(Error::NoMemory)?;

        let mut buf: Vec<AtomicU8> = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| Error::NoMemory)?;
        buf.extend((0..len).map(|_| AtomicU8::new(0)));

        Ok(Self {
            buf: buf.into_boxed_slice(),
            capacity,
            width,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            overruns: AtomicUsize::new(0),
        })
    }

    /// Storage bytes needed per character of `bits` bits
    #[inline]
    pub const fn width_for_bits(bits: u8) -> usize {
        if bits > 8 {
            2
        } else {
            1
        }
    }

    /// Capacity in characters
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per character
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Size of the backing storage in bytes
    #[inline]
    pub fn storage_len(&self) -> usize {
        self.buf.len()
    }

    /// Characters available to read
    #[inline]
    pub fn available(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    /// Free character slots
    #[inline]
    pub fn space_avail(&self) -> usize {
        self.capacity - self.available()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Check if the buffer is full
    pub fn is_full(&self) -> bool {
        self.space_avail() == 0
    }

    /// Push one character (producer side)
    ///
    /// Never blocks. Returns `false` and records an overrun when full.
    pub fn push(&self, word: u16) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head.wrapping_sub(tail) >= self.capacity {
            self.overruns.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let offset = (head % self.capacity) * self.width;
        let [lo, hi] = word.to_le_bytes();
        self.buf[offset].store(lo, Ordering::Relaxed);
        if self.width == 2 {
            self.buf[offset + 1].store(hi, Ordering::Relaxed);
        }

        self.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Pop characters into `out` (consumer side)
    ///
    /// Copies at most `out.len() / width` whole characters and returns the
    /// number of bytes written. Never blocks.
    pub fn pop(&self, out: &mut [u8]) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        let avail = head.wrapping_sub(tail);
        let count = avail.min(out.len() / self.width);

        for i in 0..count {
            let offset = (tail.wrapping_add(i) % self.capacity) * self.width;
            for b in 0..self.width {
                out[i * self.width + b] = self.buf[offset + b].load(Ordering::Relaxed);
            }
        }

        self.tail.store(tail.wrapping_add(count), Ordering::Release);
        count * self.width
    }

    /// Pop a single character (consumer side)
    pub fn pop_word(&self) -> Option<u16> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        let offset = (tail % self.capacity) * self.width;
        let lo = self.buf[offset].load(Ordering::Relaxed);
        let hi = if self.width == 2 {
            self.buf[offset + 1].load(Ordering::Relaxed)
        } else {
            0
        };

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(u16::from_le_bytes([lo, hi]))
    }

    /// Discard every unread character (consumer side)
    ///
    /// Safe while the producer is running: only `tail` is stored.
    pub fn clear(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }

    /// Characters dropped since the last [`take_overruns`](Self::take_overruns)
    pub fn overruns(&self) -> usize {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Read and reset the overrun counter
    pub fn take_overruns(&self) -> usize {
        self.overruns.swap(0, Ordering::Relaxed)
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("width", &self.width)
            .field("available", &self.available())
            .field("overruns", &self.overruns())
            .finish()
    }
}

/// Producer handle given to a receive interrupt handler
///
/// The device keeps the consumer side; the handle only pushes.
#[derive(Clone, Debug)]
pub struct RxSink {
    buf: Arc<RingBuffer>,
}

impl RxSink {
    /// Wrap a shared ring buffer
    pub fn new(buf: Arc<RingBuffer>) -> Self {
        Self { buf }
    }

    /// Push one received character. Returns `false` on overrun.
    #[inline]
    pub fn push(&self, word: u16) -> bool {
        self.buf.push(word)
    }

    /// Free character slots
    #[inline]
    pub fn space_avail(&self) -> usize {
        self.buf.space_avail()
    }

    /// Record a character lost before it reached the buffer
    /// (hardware FIFO overrun)
    pub fn record_overrun(&self) {
        self.buf.overruns.fetch_add(1, Ordering::Relaxed);
    }
}
