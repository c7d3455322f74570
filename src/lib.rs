// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Schemacodec
//!
//! Multi-format message conversion registry for Avro, Protobuf and Thrift.
//!
//! A JSON catalog names every schema, its type and its dependencies. Each
//! schema is loaded in isolation from its own directory and those of its
//! dependency closure; requests then convert between a human-readable text
//! form and the binary wire form of that schema:
//!
//! | Type       | Text side                 | Binary side                        |
//! |------------|---------------------------|------------------------------------|
//! | `avro`     | JSON                      | datum or object container file     |
//! | `protobuf` | text format               | wire format, optionally delimited  |
//! | `thrift`   | Thrift JSON protocol      | binary or compact protocol         |
//!
//! ## Architecture
//!
//! - `core/` - errors, request parameters, the format enum
//! - `schema/` - catalog, dependency resolver, per-schema loaders
//! - `encoding/` - one [`FormatStrategy`] per format
//! - `registry/` - generations, dispatch, hot reload
//! - `io/` - stream filter chains (compression, base64)
//! - `config` - TOML service configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use schemacodec::{Parameters, SchemaRegistry};
//!
//! let registry = SchemaRegistry::open("/srv/schemas/catalog.json", "/srv/schemas")?;
//!
//! let mut binary = Vec::new();
//! registry.encode(
//!     "addr-book",
//!     &mut "name: \"Ada\"\nid: 1\n".as_bytes(),
//!     &mut binary,
//!     &Parameters::new().with("m", "Person"),
//! )?;
//!
//! let mut text = Vec::new();
//! registry.decode("addr-book", &mut binary.as_slice(), &mut text, &Parameters::new())?;
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

pub use core::{ErrorCategory, Parameters, RegistryError, Result, SchemaFormat};

// Catalog and loading
pub mod schema;

pub use schema::{Catalog, DependencyResolver, MessageIndex, SchemaEntry};

// Format strategies
pub mod encoding;

pub use encoding::{AvroStrategy, FormatStrategy, ProtobufStrategy, ThriftStrategy};

// Stream filters
pub mod io;

pub use io::{FilterChain, FilterKind};

// Live registry
pub mod registry;

pub use registry::{
    DispatchRegistry, Generation, ReloadHandle, ReloadManager, ReloadOutcome, ReloadState,
    SchemaRegistry,
};

pub mod config;

pub use config::ServiceConfig;
