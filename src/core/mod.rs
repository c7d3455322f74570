// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout schemacodec.
//!
//! This module provides the foundational types for the library:
//! - [`RegistryError`] - Error taxonomy shared by every component
//! - [`Parameters`] - Per-request option bag
//! - [`SchemaFormat`] - Schema system identifier

pub mod error;
pub mod params;

pub use error::{ErrorCategory, RegistryError, Result};
pub use params::Parameters;

/// Schema system identifier, as written in the catalog `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaFormat {
    /// Apache Avro: the schema document itself drives conversion
    Avro,
    /// Protocol Buffers: one primary artifact per schema
    Protobuf,
    /// Apache Thrift: several artifacts per schema, some error-like
    Thrift,
}

/// Error returned when parsing a `SchemaFormat` from string fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseFormatError {
    _private: (),
}

impl std::fmt::Display for ParseFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid schema type, expected 'avro', 'protobuf', or 'thrift'"
        )
    }
}

impl std::error::Error for ParseFormatError {}

impl std::str::FromStr for SchemaFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "avro" => Ok(SchemaFormat::Avro),
            "protobuf" => Ok(SchemaFormat::Protobuf),
            "thrift" => Ok(SchemaFormat::Thrift),
            _ => Err(ParseFormatError { _private: () }),
        }
    }
}

impl SchemaFormat {
    /// All built-in formats, in registration order.
    pub const ALL: [SchemaFormat; 3] = [
        SchemaFormat::Avro,
        SchemaFormat::Protobuf,
        SchemaFormat::Thrift,
    ];

    /// Whether schemas of this format are resolved from generated artifacts
    /// through an isolated per-schema search path.
    pub fn is_code_loaded(&self) -> bool {
        matches!(self, SchemaFormat::Protobuf | SchemaFormat::Thrift)
    }

    /// Convert to the catalog tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaFormat::Avro => "avro",
            SchemaFormat::Protobuf => "protobuf",
            SchemaFormat::Thrift => "thrift",
        }
    }
}

impl std::fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
