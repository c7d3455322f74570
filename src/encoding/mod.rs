// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Format strategies.
//!
//! One strategy per [`SchemaFormat`](crate::core::SchemaFormat), each owning
//! the loaded artifacts of every schema of that format:
//! - [`avro`] - JSON text to Avro binary datums or object container files
//! - [`protobuf`] - text format to wire format, single or length-delimited
//! - [`thrift`] - TJSON to the binary or compact protocol

pub mod avro;
pub mod protobuf;
pub mod strategy;
pub mod thrift;

pub use avro::{AvroArtifact, AvroStrategy};
pub use protobuf::ProtobufStrategy;
pub use strategy::{FormatStrategy, LoadContext};
pub use thrift::ThriftStrategy;
