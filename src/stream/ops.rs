// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Generic Stream Operations
//!
//! User-facing read/write helpers built on [`Stream`]. None of them know
//! which device they talk to.
//!
//! Blocking reads and writes repeat the underlying call until the request is
//! satisfied, the stream ends, or the device reports
//! [`Error::ShouldWait`]. A `ShouldWait` before any byte moved becomes
//! `Ok(None)`; after some progress the partial result is returned.

use alloc::vec;
use alloc::vec::Vec;

use super::{IoctlRequest, PollFlags, Stream};
use crate::err::{Error, Result};

/// Chunk size used by read-all
const READ_CHUNK: usize = 256;

/// Repeat reads until `buf` is full
///
/// # Returns
///
/// `(bytes_read, hit_should_wait)`
fn read_full<S: Stream + ?Sized>(stream: &mut S, buf: &mut [u8]) -> Result<(usize, bool)> {
    let mut done = 0;

    while done < buf.len() {
        match stream.read(&mut buf[done..]) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(Error::ShouldWait) => return Ok((done, true)),
            Err(err) => return Err(err),
        }
    }

    Ok((done, false))
}

/// Repeat writes until all of `data` is accepted
fn write_full<S: Stream + ?Sized>(stream: &mut S, data: &[u8]) -> Result<(usize, bool)> {
    let mut done = 0;

    while done < data.len() {
        match stream.write(&data[done..]) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(Error::ShouldWait) => return Ok((done, true)),
            Err(err) => return Err(err),
        }
    }

    Ok((done, false))
}

/// Read from a stream
///
/// # Arguments
///
/// * `size` - `Some(n)` to read up to `n` bytes, `None` to read until the
///   stream ends or stops producing data
///
/// # Returns
///
/// `None` if no data was available at all, otherwise the bytes read (empty
/// at end of stream)
pub fn read<S: Stream + ?Sized>(stream: &mut S, size: Option<usize>) -> Result<Option<Vec<u8>>> {
    let Some(size) = size else {
        return read_all(stream);
    };

    let mut buf = vec![0u8; size];
    let (n, should_wait) = read_full(stream, &mut buf)?;
    if n == 0 && should_wait {
        return Ok(None);
    }
    buf.truncate(n);
    Ok(Some(buf))
}

fn read_all<S: Stream + ?Sized>(stream: &mut S) -> Result<Option<Vec<u8>>> {
    let mut data = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => data.extend_from_slice(&chunk[..n]),
            Err(Error::ShouldWait) => {
                if data.is_empty() {
                    return Ok(None);
                }
                break;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(Some(data))
}

/// Read into a caller buffer
///
/// # Arguments
///
/// * `buf` - Destination
/// * `len` - Optional byte count. Streams with `pyserial_compatibility`
///   reject a count that differs from `buf.len()`; others clamp it.
///
/// # Returns
///
/// `None` if no data was available, otherwise the number of bytes read
///
/// # Errors
///
/// `InvalidArgs` for a forbidden length argument
pub fn readinto<S: Stream + ?Sized>(
    stream: &mut S,
    buf: &mut [u8],
    len: Option<usize>,
) -> Result<Option<usize>> {
    let len = match len {
        None => buf.len(),
        Some(len) if stream.properties().pyserial_compatibility && len != buf.len() => {
            log_debug!("readinto: length argument not allowed for this stream");
            return Err(Error::InvalidArgs);
        }
        Some(len) => len.min(buf.len()),
    };

    let (n, should_wait) = read_full(stream, &mut buf[..len])?;
    if n == 0 && should_wait {
        return Ok(None);
    }
    Ok(Some(n))
}

/// Read one line
///
/// Reads a byte at a time up to and including `\n`, or until `limit`
/// bytes, end of stream, or no more data.
///
/// # Returns
///
/// `None` if no byte was available, otherwise the (possibly partial) line
pub fn readline<S: Stream + ?Sized>(stream: &mut S, limit: Option<usize>) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while limit.map_or(true, |limit| line.len() < limit) {
        match stream.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(Error::ShouldWait) => {
                if line.is_empty() {
                    return Ok(None);
                }
                break;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(Some(line))
}

/// Write all of `data`
///
/// # Returns
///
/// `None` if nothing could be written, otherwise the bytes written
pub fn write<S: Stream + ?Sized>(stream: &mut S, data: &[u8]) -> Result<Option<usize>> {
    let (n, should_wait) = write_full(stream, data)?;
    if n == 0 && should_wait && !data.is_empty() {
        return Ok(None);
    }
    Ok(Some(n))
}

/// Query readiness without waiting
pub fn poll<S: Stream + ?Sized>(stream: &mut S, flags: PollFlags) -> Result<PollFlags> {
    let ready = stream.ioctl(IoctlRequest::Poll(flags))?;
    Ok(PollFlags::from_bits_truncate(ready as u32))
}

/// Wait for buffered output to be sent
pub fn flush<S: Stream + ?Sized>(stream: &mut S) -> Result {
    stream.ioctl(IoctlRequest::Flush).map(|_| ())
}

/// Iterate over lines until the stream produces nothing
pub fn lines<S: Stream>(stream: S) -> Lines<S> {
    Lines {
        stream,
        done: false,
    }
}

/// Line iterator returned by [`lines`]
///
/// Ends on an empty read, on no data, or after yielding an error.
pub struct Lines<S: Stream> {
    stream: S,
    done: bool,
}

impl<S: Stream> Lines<S> {
    /// Stop iterating and return the stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Stream> Iterator for Lines<S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match readline(&mut self.stream, None) {
            Ok(Some(line)) if !line.is_empty() => Some(Ok(line)),
            Ok(_) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
