// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf strategy using prost-reflect for dynamic message handling.
//!
//! Messages are resolved from each schema's isolated descriptor pool and
//! converted between the protobuf text format and the binary wire format.
//! With `protobuf.delimited=true` both sides carry a stream of messages:
//! blank-line-separated text blocks on one side and length-prefixed binary
//! messages on the other.

use std::collections::BTreeMap;
use std::io::{BufReader, Read, Write};

use prost::Message;
use prost_reflect::text_format::FormatOptions;
use prost_reflect::{DynamicMessage, MessageDescriptor};

use super::stream::{read_frame, TextBlocks};
use crate::core::params::PROTOBUF_DELIMITED;
use crate::core::{Parameters, RegistryError, Result, SchemaFormat};
use crate::encoding::strategy::{artifact, FormatStrategy, LoadContext};
use crate::schema::loader::protobuf::ProtobufArtifact;
use crate::schema::MessageIndex;

/// Protobuf conversion over every Protobuf schema of a generation.
#[derive(Debug, Default)]
pub struct ProtobufStrategy {
    schemas: BTreeMap<String, ProtobufArtifact>,
}

impl ProtobufStrategy {
    /// Load every Protobuf schema in the context's catalog.
    pub fn load(ctx: &mut LoadContext<'_>) -> Self {
        let schemas = ctx.load_each(SchemaFormat::Protobuf, |ctx, entry| {
            let search_path = ctx.search_path(&entry.id)?;
            ProtobufArtifact::load(&search_path)
        });
        Self { schemas }
    }

    /// Resolve the message descriptor for a request.
    fn descriptor(&self, schema_id: &str, message: Option<&str>) -> Result<MessageDescriptor> {
        let artifact = artifact(&self.schemas, schema_id)?;
        let name = artifact.index().resolve(schema_id, message)?;
        artifact.message(name).cloned().ok_or_else(|| {
            RegistryError::unknown_message(schema_id, name, artifact.index().known().iter().cloned())
        })
    }
}

fn parse_text(descriptor: &MessageDescriptor, text: &str) -> Result<DynamicMessage> {
    DynamicMessage::parse_text_format(descriptor.clone(), text)
        .map_err(|e| RegistryError::invalid_input("protobuf", e.to_string()))
}

fn decode_binary(descriptor: &MessageDescriptor, bytes: &[u8]) -> Result<DynamicMessage> {
    DynamicMessage::decode(descriptor.clone(), bytes)
        .map_err(|e| RegistryError::invalid_input("protobuf", e.to_string()))
}

/// Text format of `message`, one field per line, newline-terminated unless
/// the message is empty. String contents that are valid UTF-8 are printed
/// as text.
fn format_text(message: &DynamicMessage) -> String {
    let escaped = message.to_text_format_with_options(&FormatOptions::new().pretty(true));
    let mut text = unescape_utf8(&escaped);
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Replace octal-escaped UTF-8 sequences inside string literals with the
/// characters they encode. Literals that do not decode to UTF-8 are kept.
fn unescape_utf8(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('"') {
        out.push_str(&rest[..=open]);
        rest = &rest[open + 1..];

        let end = literal_end(rest);
        let body = &rest[..end];
        match raw_utf8(body) {
            Some(decoded) => out.push_str(&decoded),
            None => out.push_str(body),
        }
        rest = &rest[end..];
        if let Some(after) = rest.strip_prefix('"') {
            out.push('"');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Offset of the closing quote of a literal body.
fn literal_end(body: &str) -> usize {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn raw_utf8(body: &str) -> Option<String> {
    if !body.contains('\\') {
        return None;
    }
    let src = body.as_bytes();
    let mut bytes = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        if src[i] != b'\\' {
            bytes.push(src[i]);
            i += 1;
            continue;
        }
        let octal = src
            .get(i + 1..i + 4)
            .filter(|digits| digits.iter().all(|d| (b'0'..=b'7').contains(d)));
        let high = octal
            .map(|digits| digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0')))
            .and_then(|value| u8::try_from(value).ok())
            .filter(|byte| *byte >= 0x80);
        match high {
            Some(byte) => {
                bytes.push(byte);
                i += 4;
            }
            None => {
                let len = if octal.is_some() { 4 } else { 2 };
                bytes.extend_from_slice(&src[i..(i + len).min(src.len())]);
                i += len;
            }
        }
    }
    String::from_utf8(bytes).ok()
}

impl FormatStrategy for ProtobufStrategy {
    fn format(&self) -> SchemaFormat {
        SchemaFormat::Protobuf
    }

    fn serialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        let descriptor = self.descriptor(schema_id, message)?;

        if params.flag(PROTOBUF_DELIMITED) {
            for block in TextBlocks::new(BufReader::new(input)) {
                let parsed = parse_text(&descriptor, &block?)?;
                output.write_all(&parsed.encode_length_delimited_to_vec())?;
            }
        } else {
            let mut text = String::new();
            input.read_to_string(&mut text)?;
            let parsed = parse_text(&descriptor, &text)?;
            output.write_all(&parsed.encode_to_vec())?;
        }

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
        let descriptor = self.descriptor(schema_id, message)?;

        if params.flag(PROTOBUF_DELIMITED) {
            let mut reader = BufReader::new(input);
            while let Some(frame) = read_frame(&mut reader)? {
                let decoded = decode_binary(&descriptor, &frame)?;
                output.write_all(format_text(&decoded).as_bytes())?;
                output.write_all(b"\n")?;
            }
        } else {
            let mut bytes = Vec::new();
            input.read_to_end(&mut bytes)?;
            let decoded = decode_binary(&descriptor, &bytes)?;
            output.write_all(format_text(&decoded).as_bytes())?;
        }

        output.flush()?;
        Ok(())
    }

    fn message_index(&self, schema_id: &str) -> Option<&MessageIndex> {
        self.schemas.get(schema_id).map(ProtobufArtifact::index)
    }

    fn loaded_schemas(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }
}
