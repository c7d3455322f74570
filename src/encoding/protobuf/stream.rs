// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Framing for delimited Protobuf streams.
//!
//! - Text side: messages are blocks of non-blank lines separated by one or
//!   more blank lines. Lines are trimmed.
//! - Binary side: each message is preceded by its length as a base-128
//!   varint, as produced by `writeDelimitedTo`-style writers.

use std::io::{self, BufRead, Read};

use crate::core::{RegistryError, Result};

/// Longest valid varint encoding of a 64-bit length.
const MAX_VARINT_LEN: usize = 10;

/// Iterator over blank-line-separated text blocks.
pub struct TextBlocks<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> TextBlocks<R> {
    /// Create a block iterator over `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for TextBlocks<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut block = String::new();
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.done = true;
                    return (!block.is_empty()).then_some(Ok(block));
                }
                Ok(_) => {
                    let trimmed = self.line.trim();
                    if trimmed.is_empty() {
                        if !block.is_empty() {
                            return Some(Ok(block));
                        }
                    } else {
                        block.push_str(trimmed);
                        block.push('\n');
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Read one length prefix.
///
/// Returns `Ok(None)` on a clean end of stream before the first byte.
pub fn read_length_prefix(reader: &mut dyn Read) -> Result<Option<usize>> {
    let mut value: u64 = 0;
    let mut byte = [0u8; 1];

    for position in 0..MAX_VARINT_LEN {
        let read = loop {
            match reader.read(&mut byte) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if read == 0 {
            if position == 0 {
                return Ok(None);
            }
            return Err(RegistryError::invalid_input(
                "protobuf",
                "stream ends inside a length prefix",
            ));
        }

        value |= u64::from(byte[0] & 0x7f) << (7 * position);
        if byte[0] & 0x80 == 0 {
            return usize::try_from(value).map(Some).map_err(|_| {
                RegistryError::invalid_input("protobuf", format!("length prefix {value} too large"))
            });
        }
    }

    Err(RegistryError::invalid_input(
        "protobuf",
        "length prefix longer than 10 bytes",
    ))
}

/// Read one length-delimited frame, or `None` at a clean end of stream.
pub fn read_frame(reader: &mut dyn Read) -> Result<Option<Vec<u8>>> {
    let Some(len) = read_length_prefix(reader)? else {
        return Ok(None);
    };

    let mut frame = Vec::new();
    let copied = reader.take(len as u64).read_to_end(&mut frame)?;
    if copied < len {
        return Err(RegistryError::invalid_input(
            "protobuf",
            format!("truncated message: expected {len} bytes, got {copied}"),
        ));
    }
    Ok(Some(frame))
}
