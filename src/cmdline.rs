// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Command Line Parsing
//!
//! Parses boot-argument style configuration strings into `key=value`
//! entries. Board code uses this to override device defaults without a
//! rebuild.
//!
//! # Design
//!
//! - Entries are separated by spaces, tabs or newlines
//! - A key without `=` has the value `"true"`
//! - Later entries win over earlier ones with the same key
//! - Entries borrow from the input; nothing is copied
//!
//! # Usage
//!
//! ```rust
//! use busio::cmdline::Cmdline;
//!
//! let args = Cmdline::parse("uart0.baudrate=115200 uart0.rs485_invert");
//!
//! assert_eq!(args.get_u32("uart0.baudrate", 9600), Ok(115_200));
//! assert!(args.get_bool("uart0.rs485_invert", false));
//! ```

use alloc::vec::Vec;

use crate::err::{ConfigError, Result};

/// Value given to keys that appear without `=`
const IMPLICIT_VALUE: &str = "true";

/// Parsed `key=value` entries
#[derive(Debug, Clone, Default)]
pub struct Cmdline<'a> {
    entries: Vec<(&'a str, &'a str)>,
}

impl<'a> Cmdline<'a> {
    /// Parse a whitespace separated argument string
    pub fn parse(data: &'a str) -> Self {
        let mut args = Self::default();
        args.append(data);
        args
    }

    /// Append more arguments
    ///
    /// # Arguments
    ///
    /// * `data` - Whitespace separated `key=value` (or bare `key`) entries
    pub fn append(&mut self, data: &'a str) {
        for word in data.split_ascii_whitespace() {
            let entry = match word.split_once('=') {
                Some((key, value)) => (key, value),
                None => (word, IMPLICIT_VALUE),
            };
            if !entry.0.is_empty() {
                self.entries.push(entry);
            }
        }
    }

    /// Number of entries
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no entries were parsed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the raw value for `key`
    ///
    /// # Returns
    ///
    /// The value of the last entry with this key, or `None`
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|&(_, v)| v)
    }

    /// Get a boolean value
    ///
    /// `"0"`, `"false"` and `"off"` are false; any other value is true.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(v) => !matches!(v, "0" | "false" | "off"),
        }
    }

    /// Get an unsigned value, decimal or `0x` hexadecimal
    ///
    /// # Errors
    ///
    /// `InvalidValue` if the key is present but does not parse
    pub fn get_u32(&self, key: &str, default: u32) -> Result<u32> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => parse_u32(v).ok_or_else(|| ConfigError::InvalidValue(key_name(key)).into()),
        }
    }

    /// Get a floating point value
    ///
    /// # Errors
    ///
    /// `InvalidValue` if the key is present but does not parse
    pub fn get_f32(&self, key: &str, default: f32) -> Result<f32> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v
                .parse::<f32>()
                .map_err(|_| ConfigError::InvalidValue(key_name(key)).into()),
        }
    }

    /// Iterate over entries in parse order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.entries.iter().copied()
    }
}

fn parse_u32(v: &str) -> Option<u32> {
    match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => v.parse::<u32>().ok(),
    }
}

/// Map a lookup key to a static name for error messages
///
/// Only the last dotted component is kept, so `uart0.baudrate` reports as
/// `baudrate`.
fn key_name(key: &str) -> &'static str {
    const KNOWN: &[&str] = &[
        "baudrate",
        "bits",
        "parity",
        "stop",
        "timeout",
        "rxbuf",
        "tx",
        "rx",
        "rts",
        "cts",
        "rs485_dir",
        "rs485_invert",
    ];
    let field = key.rsplit('.').next().unwrap_or(key);
    KNOWN
        .iter()
        .copied()
        .find(|&known| known == field)
        .unwrap_or("argument")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::Error;

    #[test]
    fn test_cmdline_empty() {
        let args = Cmdline::parse("");
        assert!(args.is_empty());
        assert!(args.get("test").is_none());
    }

    #[test]
    fn test_key_value_and_bare_key() {
        let args = Cmdline::parse("  uart.baudrate=115200\tuart.rs485_invert\nuart.parity=even ");
        assert_eq!(args.count(), 3);
        assert_eq!(args.get("uart.baudrate"), Some("115200"));
        assert_eq!(args.get("uart.rs485_invert"), Some("true"));
        assert_eq!(args.get("uart.parity"), Some("even"));
    }

    #[test]
    fn test_last_entry_wins() {
        let mut args = Cmdline::parse("a=1");
        args.append("a=2");
        assert_eq!(args.get_u32("a", 0), Ok(2));
    }

    #[test]
    fn test_get_bool() {
        let args = Cmdline::parse("x=off y=0 z=yes w");
        assert!(!args.get_bool("x", true));
        assert!(!args.get_bool("y", true));
        assert!(args.get_bool("z", false));
        assert!(args.get_bool("w", false));
        assert!(args.get_bool("missing", true));
    }

    #[test]
    fn test_get_numbers() {
        let args = Cmdline::parse("hex=0x1F dec=42 t=0.25 bad=12z");
        assert_eq!(args.get_u32("hex", 0), Ok(31));
        assert_eq!(args.get_u32("dec", 0), Ok(42));
        assert_eq!(args.get_u32("missing", 7), Ok(7));
        assert_eq!(args.get_f32("t", 1.0), Ok(0.25));
        assert!(args.get_u32("bad", 0).is_err());
    }

    #[test]
    fn test_error_names_field() {
        let args = Cmdline::parse("uart1.stop=two");
        assert_eq!(
            args.get_u32("uart1.stop", 1),
            Err(Error::Config(ConfigError::InvalidValue("stop")))
        );
    }
}
