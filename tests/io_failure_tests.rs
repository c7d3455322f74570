// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Conversions against a source or sink that fails mid-request.
//!
//! A caller that hangs up surfaces as `RegistryError::Io` carrying the
//! stream's error kind, for every format and through filter chains.

mod common;

use std::io::{self, Read, Write};

use common::standard_tree;
use schemacodec::{Parameters, RegistryError, SchemaRegistry};

/// A sink whose reader went away.
struct ClosedSink;

impl Write for ClosedSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A source that fails after handing out a prefix of `data`.
struct BrokenSource {
    data: &'static [u8],
    remaining: usize,
}

impl BrokenSource {
    fn after(data: &'static [u8], count: usize) -> Self {
        Self {
            data,
            remaining: count,
        }
    }
}

impl Read for BrokenSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "source reset"));
        }
        let n = buf.len().min(self.remaining).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        self.remaining -= n;
        Ok(n)
    }
}

/// Schema, message, text input and binary input for each format.
const CASES: &[(&str, &str, &str, &[u8])] = &[
    (
        "user",
        "User",
        r#"{"name": "Ada", "age": 36, "email": null}"#,
        &[0x06, b'A', b'd', b'a', 0x48, 0x00],
    ),
    (
        "addr-book",
        "Person",
        "name: \"Ada\"\nid: 1\n",
        &[0x0a, 0x03, b'A', b'd', b'a', 0x10, 0x01],
    ),
    (
        "shapes",
        "Point",
        r#"{"1":{"i32":1},"2":{"str":"a"}}"#,
        &[0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x0b, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, b'a', 0x00],
    ),
];

fn open(tree: &common::SchemaTree) -> SchemaRegistry {
    SchemaRegistry::open(tree.catalog_path(), tree.root()).unwrap()
}

fn assert_io(result: Result<(), RegistryError>, kind: io::ErrorKind, what: &str) {
    match result {
        Err(RegistryError::Io { kind: actual, .. }) => assert_eq!(actual, kind, "{what}"),
        other => panic!("{what}: expected an I/O error, got {other:?}"),
    }
}

#[test]
fn test_closed_sink_is_io_error() {
    let tree = standard_tree("io_sink");
    let registry = open(&tree);

    for (schema, message, text, _) in CASES {
        for filters in ["", "gzip,base64"] {
            let params = Parameters::new().with("m", *message).with("f", filters);
            let result = registry.encode(schema, &mut text.as_bytes(), &mut ClosedSink, &params);
            assert_io(
                result,
                io::ErrorKind::BrokenPipe,
                &format!("encode {schema} with '{filters}'"),
            );
        }
    }
}

#[test]
fn test_failing_source_is_io_error() {
    let tree = standard_tree("io_source");
    let registry = open(&tree);

    for (schema, message, _, binary) in CASES {
        // fails before the first byte, then partway through the message
        for count in [0, 3] {
            let params = Parameters::new().with("m", *message);
            let mut source = BrokenSource::after(binary, count);
            let result = registry.decode(schema, &mut source, &mut Vec::new(), &params);
            assert_io(
                result,
                io::ErrorKind::ConnectionReset,
                &format!("decode {schema} after {count} bytes"),
            );
        }
    }
}

#[test]
fn test_failing_source_under_filters_is_io_error() {
    let tree = standard_tree("io_source_filters");
    let registry = open(&tree);

    for (schema, message, text, _) in CASES {
        let mut wire = Vec::new();
        let params = Parameters::new().with("m", *message).with("f", "gzip,base64");
        registry
            .encode(schema, &mut text.as_bytes(), &mut wire, &params)
            .unwrap();
        let wire: &'static [u8] = Box::leak(wire.into_boxed_slice());

        for count in [0, 5] {
            let mut source = BrokenSource::after(wire, count);
            let result = registry.decode(schema, &mut source, &mut Vec::new(), &params);
            assert_io(
                result,
                io::ErrorKind::ConnectionReset,
                &format!("decode {schema} through gzip,base64 after {count} bytes"),
            );
        }
    }
}

#[test]
fn test_corrupt_filtered_input_is_invalid_input() {
    let tree = standard_tree("io_corrupt");
    let registry = open(&tree);

    for (schema, message, _, _) in CASES {
        for (filters, wire) in [
            ("base64", &b"not*base64!"[..]),
            ("gzip", &b"plain text, not gzip"[..]),
            ("zstd", &b"\x00\x01\x02\x03 not a frame"[..]),
        ] {
            let params = Parameters::new().with("m", *message).with("f", filters);
            let result = registry.decode(schema, &mut &wire[..], &mut Vec::new(), &params);
            assert!(
                matches!(result, Err(RegistryError::InvalidInput { .. })),
                "decode {schema} with '{filters}': {result:?}"
            );
        }
    }
}
