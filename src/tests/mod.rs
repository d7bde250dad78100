// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! busio Test Suite
//!
//! Scenario tests that drive whole devices against simulated hardware.
//! Unit tests live next to the code they cover.
//!
//! # Organization
//!
//! - [`sim`] - Simulated platform clock, loopback peripheral and PL011
//!   register file
//! - [`uart_tests`] - UART lifecycle, timeouts, buffering and RS-485
//! - [`pl011_tests`] - PL011 programming and interrupt-driven receive
//! - [`stream_tests`] - Generic stream operations on a live UART

pub mod sim;

mod stream_tests;
