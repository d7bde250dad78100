// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Platform Services
//!
//! The device layer needs three things from the surrounding runtime: a
//! monotonic millisecond clock, a hook that runs pending background work
//! (USB, display refresh, ...) while a caller waits, and a way to learn that
//! the user pressed the console interrupt key.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut deadline = Deadline::start(platform.as_ref(), timeout_ms);
//! loop {
//!     wait_step(platform.as_ref())?;
//!     if got_char() {
//!         deadline.restart(platform.as_ref());
//!     } else if deadline.expired(platform.as_ref()) {
//!         break;
//!     }
//! }
//! ```

use crate::err::{Error, Result};

/// Runtime services used by waiting operations
pub trait Platform: Send + Sync {
    /// Monotonic milliseconds since an arbitrary epoch
    fn ticks_ms(&self) -> u64;

    /// Run pending background work
    ///
    /// Called once per iteration of every wait loop.
    fn run_background_tasks(&self) {}

    /// Whether the console interrupt is pending
    fn is_interrupted(&self) -> bool {
        false
    }
}

/// Convert a timeout in seconds to whole milliseconds
///
/// Callers validate the range; negative or non-finite input yields 0.
pub fn timeout_to_ms(timeout: f32) -> u64 {
    if timeout.is_finite() && timeout > 0.0 {
        (timeout * 1000.0) as u64
    } else {
        0
    }
}

/// One iteration of a wait loop
///
/// Runs background tasks, then reports a pending console interrupt.
///
/// # Returns
///
/// `Err(Error::Canceled)` if the wait must be abandoned
#[inline]
pub fn wait_step(platform: &dyn Platform) -> Result {
    platform.run_background_tasks();
    if platform.is_interrupted() {
        log_debug!("wait canceled by console interrupt");
        return Err(Error::Canceled);
    }
    Ok(())
}

/// Restartable inactivity deadline
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: u64,
    timeout_ms: u64,
}

impl Deadline {
    /// Start a deadline `timeout_ms` from now
    pub fn start(platform: &dyn Platform, timeout_ms: u64) -> Self {
        Self {
            start: platform.ticks_ms(),
            timeout_ms,
        }
    }

    /// Restart the timer from now
    pub fn restart(&mut self, platform: &dyn Platform) {
        self.start = platform.ticks_ms();
    }

    /// Milliseconds since the last (re)start
    pub fn elapsed(&self, platform: &dyn Platform) -> u64 {
        platform.ticks_ms().saturating_sub(self.start)
    }

    /// Whether the timeout has fully elapsed
    pub fn expired(&self, platform: &dyn Platform) -> bool {
        self.elapsed(platform) >= self.timeout_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    struct StepClock {
        now: AtomicU64,
        interrupted: AtomicBool,
    }

    impl Platform for StepClock {
        fn ticks_ms(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }

        fn run_background_tasks(&self) {
            self.now.fetch_add(10, Ordering::SeqCst);
        }

        fn is_interrupted(&self) -> bool {
            self.interrupted.load(Ordering::SeqCst)
        }
    }

    fn clock() -> StepClock {
        StepClock {
            now: AtomicU64::new(1000),
            interrupted: AtomicBool::new(false),
        }
    }

    #[test]
    fn test_timeout_to_ms() {
        assert_eq!(timeout_to_ms(0.5), 500);
        assert_eq!(timeout_to_ms(0.0), 0);
        assert_eq!(timeout_to_ms(100.0), 100_000);
        assert_eq!(timeout_to_ms(-1.0), 0);
        assert_eq!(timeout_to_ms(f32::NAN), 0);
    }

    #[test]
    fn test_deadline_expiry_and_restart() {
        let platform = clock();
        let mut deadline = Deadline::start(&platform, 50);

        for _ in 0..4 {
            wait_step(&platform).unwrap();
        }
        assert_eq!(deadline.elapsed(&platform), 40);
        assert!(!deadline.expired(&platform));

        deadline.restart(&platform);
        wait_step(&platform).unwrap();
        assert_eq!(deadline.elapsed(&platform), 10);

        for _ in 0..4 {
            wait_step(&platform).unwrap();
        }
        assert!(deadline.expired(&platform));
    }

    #[test]
    fn test_zero_timeout_expires_immediately() {
        let platform = clock();
        let deadline = Deadline::start(&platform, 0);
        assert!(deadline.expired(&platform));
    }

    #[test]
    fn test_wait_step_interrupt() {
        let platform = clock();
        platform.interrupted.store(true, Ordering::SeqCst);
        assert_eq!(wait_step(&platform), Err(Error::Canceled));
    }
}
