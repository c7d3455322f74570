// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Filter chains applied around conversions (`f` parameter).

mod common;

use std::io::{Read, Write};

use common::{standard_tree, SchemaTree};
use flate2::read::GzDecoder;
use schemacodec::{FilterChain, Parameters, RegistryError, SchemaRegistry};

/// Wire bytes of `Person { name: "Ada", id: 1 }`.
const PERSON: &[u8] = &[0x0a, 0x03, b'A', b'd', b'a', 0x10, 0x01];
const PERSON_TEXT: &str = "name: \"Ada\"\nid: 1\n";

fn open(tree: &SchemaTree) -> SchemaRegistry {
    SchemaRegistry::open(tree.catalog_path(), tree.root()).unwrap()
}

fn encode(registry: &SchemaRegistry, filters: &str) -> Vec<u8> {
    let mut out = Vec::new();
    registry
        .encode(
            "addr-book",
            &mut PERSON_TEXT.as_bytes(),
            &mut out,
            &Parameters::new().with("f", filters),
        )
        .unwrap();
    out
}

fn decode(registry: &SchemaRegistry, filters: &str, bytes: &[u8]) -> String {
    let mut out = Vec::new();
    registry
        .decode(
            "addr-book",
            &mut &bytes[..],
            &mut out,
            &Parameters::new().with("f", filters),
        )
        .unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_gzip_output_is_standard() {
    let tree = standard_tree("filter_gzip");
    let registry = open(&tree);

    let wrapped = encode(&registry, "gzip");
    assert_eq!(&wrapped[..2], &[0x1f, 0x8b]);

    let mut plain = Vec::new();
    GzDecoder::new(wrapped.as_slice())
        .read_to_end(&mut plain)
        .unwrap();
    assert_eq!(plain, PERSON);
}

#[test]
fn test_base64_output() {
    let tree = standard_tree("filter_base64");
    let registry = open(&tree);

    assert_eq!(encode(&registry, "base64raw"), b"CgNBZGEQAQ==");
    assert_eq!(encode(&registry, "base64"), b"CgNBZGEQAQ==\r\n");

    // whitespace and missing padding are tolerated on input
    let text = decode(&registry, "base64", b"CgNB\nZGEQ AQ");
    assert!(text.contains("name: \"Ada\""), "{text}");
}

#[test]
fn test_every_filter_round_trips() {
    let tree = standard_tree("filter_all");
    let registry = open(&tree);

    for filters in [
        "", "base64", "base64raw", "bzip2", "deflate", "gzip", "lz4", "snappy", "zstd",
        "gzip,base64", "zstd, lz4 ,base64raw", "snappy,deflate,bzip2",
    ] {
        let wrapped = encode(&registry, filters);
        let text = decode(&registry, filters, &wrapped);
        assert!(text.contains("name: \"Ada\""), "filters '{filters}': {text}");
        assert!(text.contains("id: 1"), "filters '{filters}': {text}");
    }
}

#[test]
fn test_chain_order_is_significant() {
    let tree = standard_tree("filter_order");
    let registry = open(&tree);

    // the first filter is the outermost layer: base64 of a gzip stream
    let wrapped = encode(&registry, "base64,gzip");
    assert!(wrapped.iter().all(|b| b.is_ascii()));

    let mut out = Vec::new();
    let err = registry
        .decode(
            "addr-book",
            &mut wrapped.as_slice(),
            &mut out,
            &Parameters::new().with("f", "gzip,base64"),
        )
        .unwrap_err();
    // the base64 text is not a gzip stream
    assert!(matches!(err, RegistryError::InvalidInput { .. }), "{err:?}");
}

#[test]
fn test_skip_prefix() {
    let tree = standard_tree("filter_skip");
    let registry = open(&tree);

    let mut framed = vec![0xde, 0xad, 0xbe];
    framed.extend_from_slice(PERSON);
    assert!(decode(&registry, "skip3", &framed).contains("Ada"));

    let mut framed = b"header\0".to_vec();
    framed.extend_from_slice(PERSON);
    assert!(decode(&registry, "skip0", &framed).contains("Ada"));

    let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    gz.write_all(&[0xff, 0xff]).unwrap();
    gz.write_all(PERSON).unwrap();
    let framed = gz.finish().unwrap();
    assert!(decode(&registry, "gzip,skip2", &framed).contains("Ada"));
}

#[test]
fn test_invalid_filters_are_rejected() {
    let tree = standard_tree("filter_invalid");
    let registry = open(&tree);

    for (filters, encoding) in [("rot13", true), ("skip4", true), ("rot13", false)] {
        let params = Parameters::new().with("f", filters);
        let result = if encoding {
            registry.encode("addr-book", &mut PERSON_TEXT.as_bytes(), &mut Vec::new(), &params)
        } else {
            registry.decode("addr-book", &mut &PERSON[..], &mut Vec::new(), &params)
        };
        assert!(
            matches!(result, Err(RegistryError::InvalidInput { .. })),
            "filters '{filters}'"
        );
    }

    assert_eq!(FilterChain::parse(" , ").unwrap(), FilterChain::default());
}
