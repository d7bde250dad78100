// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Stream Tests
//!
//! Generic stream operations driven through a UART on loopback hardware.

use alloc::sync::Arc;
use alloc::vec::Vec;

use super::sim::*;
use crate::dev::uart::{Uart, UartConfig};
use crate::err::Error;
use crate::stream::{self, PollFlags, Stream};

fn open(hw: &LoopbackHardware, platform: &Arc<SimPlatform>, timeout: f32) -> Uart<LoopbackHardware> {
    Uart::construct(
        hw.clone(),
        &registry(),
        platform.clone(),
        UartConfig::new().tx(TX).rx(RX).timeout(timeout),
    )
    .unwrap()
}

#[test]
fn stream_properties() {
    let uart = open(&LoopbackHardware::default(), &SimPlatform::new(), 0.0);
    let props = uart.properties();
    assert!(!props.is_text);
    assert!(props.pyserial_compatibility);
}

#[test]
fn stream_read_sized() {
    let hw = LoopbackHardware::looped();
    let mut uart = open(&hw, &SimPlatform::new(), 0.0);

    assert_eq!(stream::write(&mut uart, b"AT\r\n"), Ok(Some(4)));
    assert_eq!(stream::read(&mut uart, Some(4)), Ok(Some(b"AT\r\n".to_vec())));
    // Nothing left: no data rather than an empty read
    assert_eq!(stream::read(&mut uart, Some(4)), Ok(None));
}

#[test]
fn stream_read_short_on_timeout() {
    let platform = SimPlatform::new();
    let hw = LoopbackHardware::default();
    let mut uart = open(&hw, &platform, 0.5);

    hw.inject(b"abc");
    assert_eq!(stream::read(&mut uart, Some(8)), Ok(Some(b"abc".to_vec())));
    // The second pass waited out the timeout
    assert!(platform.now() >= 500);
}

#[test]
fn stream_read_all() {
    let hw = LoopbackHardware::default();
    let mut uart = open(&hw, &SimPlatform::new(), 0.0);

    let payload: Vec<u8> = (0..40u8).collect();
    hw.inject(&payload);
    assert_eq!(stream::read(&mut uart, None), Ok(Some(payload)));
    assert_eq!(stream::read(&mut uart, None), Ok(None));
}

#[test]
fn stream_readinto_rejects_length() {
    let hw = LoopbackHardware::default();
    let mut uart = open(&hw, &SimPlatform::new(), 0.0);
    hw.inject(b"12345678");

    let mut buf = [0u8; 4];
    assert_eq!(stream::readinto(&mut uart, &mut buf, Some(2)), Err(Error::InvalidArgs));
    assert_eq!(stream::readinto(&mut uart, &mut buf, Some(4)), Ok(Some(4)));
    assert_eq!(stream::readinto(&mut uart, &mut buf, None), Ok(Some(4)));
    assert_eq!(&buf, b"5678");
    assert_eq!(stream::readinto(&mut uart, &mut buf, None), Ok(None));
}

#[test]
fn stream_readline() {
    let hw = LoopbackHardware::default();
    let mut uart = open(&hw, &SimPlatform::new(), 0.0);

    hw.inject(b"OK\r\nERR");
    assert_eq!(stream::readline(&mut uart, None), Ok(Some(b"OK\r\n".to_vec())));
    assert_eq!(stream::readline(&mut uart, None), Ok(Some(b"ERR".to_vec())));
    assert_eq!(stream::readline(&mut uart, None), Ok(None));

    hw.inject(b"0123456789\n");
    assert_eq!(stream::readline(&mut uart, Some(4)), Ok(Some(b"0123".to_vec())));
}

#[test]
fn stream_lines() {
    let hw = LoopbackHardware::default();
    let mut uart = open(&hw, &SimPlatform::new(), 0.0);

    hw.inject(b"+CSQ: 20\r\n+CREG: 1\r\nOK\r\n");
    let lines: Vec<Vec<u8>> = stream::lines(&mut uart).map(|l| l.unwrap()).collect();
    assert_eq!(
        lines,
        [b"+CSQ: 20\r\n".to_vec(), b"+CREG: 1\r\n".to_vec(), b"OK\r\n".to_vec()]
    );
}

#[test]
fn stream_poll() {
    let hw = LoopbackHardware::default();
    let mut uart = open(&hw, &SimPlatform::new(), 0.0);

    assert_eq!(stream::poll(&mut uart, PollFlags::RD), Ok(PollFlags::empty()));
    hw.inject(b"?");
    assert_eq!(
        stream::poll(&mut uart, PollFlags::RD | PollFlags::WR),
        Ok(PollFlags::RD | PollFlags::WR)
    );
    assert_eq!(stream::flush(&mut uart), Ok(()));
}

#[test]
fn stream_write_no_progress() {
    let hw = LoopbackHardware::default();
    let mut uart = open(&hw, &SimPlatform::new(), 0.0);

    hw.state().lock().tx_budget = Some(3);
    assert_eq!(stream::write(&mut uart, b"abcdef"), Ok(Some(3)));
    assert_eq!(stream::write(&mut uart, b"abcdef"), Ok(None));
}

#[test]
fn stream_errors_after_deinit() {
    let mut uart = open(&LoopbackHardware::default(), &SimPlatform::new(), 0.0);
    uart.deinit();

    assert_eq!(stream::read(&mut uart, Some(1)), Err(Error::Deinitialized));
    assert_eq!(stream::readline(&mut uart, None), Err(Error::Deinitialized));
    assert_eq!(stream::write(&mut uart, b"x"), Err(Error::Deinitialized));
    assert_eq!(stream::poll(&mut uart, PollFlags::RD), Err(Error::Deinitialized));
}

#[test]
fn stream_read_interrupted() {
    let platform = SimPlatform::new();
    platform.interrupt_at(30);
    let mut uart = open(&LoopbackHardware::default(), &platform, 1.0);

    assert_eq!(stream::read(&mut uart, Some(1)), Err(Error::Canceled));
}
