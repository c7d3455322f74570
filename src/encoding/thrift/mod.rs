// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Thrift strategy.
//!
//! The text side is the Thrift JSON protocol (TJSON); the binary side is
//! the binary protocol, or the compact protocol with
//! `thrift.protocol=compact`. Types come from the IDL descriptions loaded
//! for each schema.

pub mod tjson;
pub mod value;
pub mod wire;

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use serde_json::Value as JsonValue;
use thrift::protocol::{
    TBinaryInputProtocol, TBinaryOutputProtocol, TCompactInputProtocol, TCompactOutputProtocol,
    TInputProtocol, TOutputProtocol,
};

use crate::core::params::THRIFT_PROTOCOL;
use crate::core::{Parameters, RegistryError, Result, SchemaFormat};
use crate::encoding::strategy::{artifact, json_error, FormatStrategy, LoadContext};
use crate::schema::loader::thrift::{StructDef, ThriftArtifact};
use crate::schema::MessageIndex;

/// Remembers the last I/O failure of a stream. The thrift transport layer
/// reports such failures without their kind.
struct Tracked<T> {
    inner: T,
    failure: Option<io::Error>,
}

impl<T> Tracked<T> {
    fn new(inner: T) -> Self {
        Self {
            inner,
            failure: None,
        }
    }

    /// Replace a protocol error caused by a stream failure with that
    /// failure. Running out of input stays a protocol error.
    fn refine(&mut self, err: RegistryError) -> RegistryError {
        match self.failure.take() {
            Some(failure) if failure.kind() != io::ErrorKind::UnexpectedEof => failure.into(),
            _ => err,
        }
    }

    fn record(&mut self, err: &io::Error) {
        self.failure = Some(io::Error::new(err.kind(), err.to_string()));
    }
}

impl<T: Read> Read for Tracked<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = self.inner.read(buf);
        if let Err(e) = &result {
            self.record(e);
        }
        result
    }
}

impl<T: Write> Write for Tracked<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buf);
        if let Err(e) = &result {
            self.record(e);
        }
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.inner.flush();
        if let Err(e) = &result {
            self.record(e);
        }
        result
    }
}

/// Wire protocol selected by `thrift.protocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireProtocol {
    Binary,
    Compact,
}

impl WireProtocol {
    /// Protocol requested by `params`; binary when unset.
    pub fn from_params(params: &Parameters) -> Result<Self> {
        match params.get(THRIFT_PROTOCOL).map(str::trim) {
            None => Ok(Self::Binary),
            Some(name) if name.is_empty() || name.eq_ignore_ascii_case("binary") => {
                Ok(Self::Binary)
            }
            Some(name) if name.eq_ignore_ascii_case("compact") => Ok(Self::Compact),
            Some(other) => Err(RegistryError::invalid_input(
                "thrift",
                format!("unsupported thrift protocol '{other}'"),
            )),
        }
    }
}

/// Thrift conversion over every Thrift schema of a generation.
#[derive(Debug, Default)]
pub struct ThriftStrategy {
    schemas: BTreeMap<String, ThriftArtifact>,
}

impl ThriftStrategy {
    /// Load every Thrift schema in the context's catalog.
    pub fn load(ctx: &mut LoadContext<'_>) -> Self {
        let schemas = ctx.load_each(SchemaFormat::Thrift, |ctx, entry| {
            let search_path = ctx.search_path(&entry.id)?;
            ThriftArtifact::load(&search_path)
        });
        Self { schemas }
    }

    fn resolve(
        &self,
        schema_id: &str,
        message: Option<&str>,
    ) -> Result<(&ThriftArtifact, &StructDef)> {
        let artifact = artifact(&self.schemas, schema_id)?;
        let name = artifact.index().resolve(schema_id, message)?;
        let def = artifact.message(name).ok_or_else(|| {
            RegistryError::unknown_message(schema_id, name, artifact.index().known().iter().cloned())
        })?;
        Ok((artifact, def))
    }
}

impl FormatStrategy for ThriftStrategy {
    fn format(&self) -> SchemaFormat {
        SchemaFormat::Thrift
    }

    fn serialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        let (artifact, def) = self.resolve(schema_id, message)?;
        let protocol = WireProtocol::from_params(params)?;

        let json: JsonValue =
            serde_json::from_reader(&mut *input).map_err(|e| json_error("thrift", e))?;
        let value = tjson::read_struct(&json, def, artifact.types())?;

        let mut sink = Tracked::new(&mut *output);
        let mut proto: Box<dyn TOutputProtocol + '_> = match protocol {
            WireProtocol::Binary => Box::new(TBinaryOutputProtocol::new(&mut sink, true)),
            WireProtocol::Compact => Box::new(TCompactOutputProtocol::new(&mut sink)),
        };
        let written = wire::write_struct(proto.as_mut(), &value, def, artifact.types())
            .and_then(|()| proto.flush().map_err(wire::thrift_error));
        drop(proto);
        written.map_err(|e| sink.refine(e))?;

        output.flush()?;
        Ok(())
    }

    fn deserialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        let (artifact, def) = self.resolve(schema_id, message)?;
        let protocol = WireProtocol::from_params(params)?;

        let mut source = Tracked::new(&mut *input);
        let mut proto: Box<dyn TInputProtocol + '_> = match protocol {
            WireProtocol::Binary => Box::new(TBinaryInputProtocol::new(&mut source, true)),
            WireProtocol::Compact => Box::new(TCompactInputProtocol::new(&mut source)),
        };
        let value = wire::read_struct(proto.as_mut(), def, artifact.types());
        drop(proto);
        let value = value.map_err(|e| source.refine(e))?;

        let mut text = String::new();
        tjson::write_struct(&mut text, &value, def, artifact.types())?;
        output.write_all(text.as_bytes())?;
        output.flush()?;
        Ok(())
    }

    fn message_index(&self, schema_id: &str) -> Option<&MessageIndex> {
        self.schemas.get(schema_id).map(ThriftArtifact::index)
    }

    fn loaded_schemas(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }
}
