// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Device Drivers
//!
//! Byte-stream peripherals exposed to interpreted code. Each device speaks
//! the generic [`stream`](crate::stream) protocol.

// UART devices
pub mod uart;

// Re-exports
pub use uart::{Uart, UartConfig};
