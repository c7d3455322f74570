// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Per-request option bag.
//!
//! A string-keyed multi-map in which the first value recorded for a key wins.
//! Keys no strategy recognizes are carried along and ignored.

use std::collections::HashMap;

use super::error::{RegistryError, Result};

/// Comma-separated stream filter list.
pub const FILTERS: &str = "f";
/// Requested message name.
pub const MESSAGE: &str = "m";
/// `file` selects Avro object container mode.
pub const AVRO_PAYLOAD: &str = "avro.payload";
/// Avro container codec name.
pub const AVRO_CODEC: &str = "avro.codec";
/// `true` selects length-delimited Protobuf streams.
pub const PROTOBUF_DELIMITED: &str = "protobuf.delimited";
/// `compact` selects the Thrift compact protocol.
pub const THRIFT_PROTOCOL: &str = "thrift.protocol";

/// Request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: HashMap<String, Vec<String>>,
}

impl Parameters {
    /// Create an empty option bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value for `key`. Later values never shadow the first one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// Every value recorded for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the first value for `key` is `true` (case-insensitive).
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }

    /// Whether the first value for `key` equals `expected` (case-insensitive).
    pub fn is(&self, key: &str, expected: &str) -> bool {
        self.get(key)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
    }

    /// Parse a `KEY=VALUE` pair and record it.
    pub fn insert_pair(&mut self, pair: &str) -> Result<()> {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            RegistryError::invalid_input("parameter", format!("expected KEY=VALUE, got '{pair}'"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(RegistryError::invalid_input(
                "parameter",
                format!("empty key in '{pair}'"),
            ));
        }
        self.insert(key, value.trim());
        Ok(())
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
