// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Avro strategy using apache-avro.
//!
//! The schema document drives conversion directly; no generated artifacts
//! are involved. Named types defined by dependency schemas are inlined into
//! the dependent schema at their first reference before parsing, so each
//! loaded schema is self-contained.
//!
//! Text is the Avro JSON encoding (see [`json`]).
//!
//! Modes:
//! - single record (default): one JSON value ⇄ one binary datum
//! - container (`avro.payload=file`): a stream of JSON values ⇄ an object
//!   container file carrying its writer schema, compressed with
//!   `avro.codec` (`null` or `deflate`)

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{Read, Write};

use apache_avro::types::Value as AvroValue;
use apache_avro::{from_avro_datum, to_avro_datum, Codec, Reader, Schema, Writer};
use serde_json::Value as JsonValue;

pub mod json;

pub use json::AvroJson;

use super::strategy::{artifact, json_error, FormatStrategy, LoadContext};
use crate::core::params::{AVRO_CODEC, AVRO_PAYLOAD};
use crate::core::{Parameters, RegistryError, Result, SchemaFormat};
use crate::schema::{MessageIndex, SchemaEntry};

/// A parsed Avro schema.
#[derive(Debug, Clone)]
pub struct AvroArtifact {
    schema: Schema,
    index: MessageIndex,
}

impl AvroArtifact {
    /// Parse `source`, inlining named types from `dependencies`.
    ///
    /// The record name (or `schema_id` for unnamed schemas) is the only
    /// known message and the default.
    pub fn parse(schema_id: &str, source: &str, dependencies: &[String]) -> Result<Self> {
        let mut document: JsonValue = serde_json::from_str(source)
            .map_err(|e| RegistryError::load_failure(schema_id, e.to_string()))?;

        if !dependencies.is_empty() {
            let mut named = NamedTypes::default();
            for dependency in dependencies {
                match serde_json::from_str::<JsonValue>(dependency) {
                    Ok(doc) => named.collect(&doc, None),
                    Err(e) => tracing::warn!(
                        schema = %schema_id,
                        error = %e,
                        "ignoring unparsable avro dependency"
                    ),
                }
            }
            named.inline(&mut document, None, &mut HashSet::new());
        }

        let schema = Schema::parse(&document)
            .map_err(|e| RegistryError::load_failure(schema_id, e.to_string()))?;
        let name = document
            .get("name")
            .and_then(JsonValue::as_str)
            .map(|name| name.rsplit('.').next().unwrap_or(name).to_string())
            .unwrap_or_else(|| schema_id.to_string());

        Ok(Self {
            schema,
            index: MessageIndex::single(name),
        })
    }

    /// Parsed schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Known messages and default.
    pub fn index(&self) -> &MessageIndex {
        &self.index
    }
}

/// Named type definitions exported by dependency schemas.
#[derive(Debug, Default)]
struct NamedTypes {
    by_full_name: HashMap<String, JsonValue>,
    by_simple_name: HashMap<String, Option<String>>,
}

fn full_name(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !name.contains('.') && !ns.is_empty() => format!("{ns}.{name}"),
        _ => name.to_string(),
    }
}

fn namespace_of(full_name: &str) -> Option<&str> {
    full_name.rsplit_once('.').map(|(ns, _)| ns)
}

fn is_named_definition(object: &serde_json::Map<String, JsonValue>) -> bool {
    matches!(
        object.get("type").and_then(JsonValue::as_str),
        Some("record" | "error" | "enum" | "fixed")
    ) && object.get("name").is_some_and(JsonValue::is_string)
}

impl NamedTypes {
    /// Record every named definition in `doc`, rewritten to its full name.
    fn collect(&mut self, doc: &JsonValue, namespace: Option<&str>) {
        match doc {
            JsonValue::Array(branches) => {
                for branch in branches {
                    self.collect(branch, namespace);
                }
            }
            JsonValue::Object(object) => {
                let mut inner_ns = namespace.map(str::to_string);
                if is_named_definition(object) {
                    let name = object.get("name").and_then(JsonValue::as_str).unwrap_or("");
                    let explicit_ns = object.get("namespace").and_then(JsonValue::as_str);
                    let full = full_name(name, explicit_ns.or(namespace));
                    inner_ns = namespace_of(&full).map(str::to_string);

                    let mut definition = object.clone();
                    definition.insert("name".into(), JsonValue::String(full.clone()));
                    definition.remove("namespace");
                    let simple = full.rsplit('.').next().unwrap_or(&full).to_string();
                    self.by_simple_name
                        .entry(simple)
                        .and_modify(|slot| *slot = None)
                        .or_insert_with(|| Some(full.clone()));
                    self.by_full_name
                        .entry(full)
                        .or_insert(JsonValue::Object(definition));
                }
                for key in ["type", "items", "values"] {
                    if let Some(child) = object.get(key) {
                        self.collect(child, inner_ns.as_deref());
                    }
                }
                if let Some(JsonValue::Array(fields)) = object.get("fields") {
                    for field in fields {
                        if let Some(ty) = field.get("type") {
                            self.collect(ty, inner_ns.as_deref());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn lookup(&self, reference: &str, namespace: Option<&str>) -> Option<(&str, &JsonValue)> {
        let candidates = [
            Some(full_name(reference, namespace)),
            Some(reference.to_string()),
            self.by_simple_name.get(reference).cloned().flatten(),
        ];
        candidates.into_iter().flatten().find_map(|candidate| {
            self.by_full_name
                .get_key_value(&candidate)
                .map(|(name, def)| (name.as_str(), def))
        })
    }

    /// Replace the first reference to each exported type with its definition.
    fn inline(&self, schema: &mut JsonValue, namespace: Option<&str>, defined: &mut HashSet<String>) {
        match schema {
            JsonValue::String(reference) => {
                if let Some((name, definition)) = self.lookup(reference, namespace) {
                    if defined.insert(name.to_string()) {
                        let mut definition = definition.clone();
                        let inner_ns = namespace_of(name).map(str::to_string);
                        self.inline_children(&mut definition, inner_ns.as_deref(), defined);
                        *schema = definition;
                    } else {
                        *schema = JsonValue::String(name.to_string());
                    }
                }
            }
            JsonValue::Array(branches) => {
                for branch in branches {
                    self.inline(branch, namespace, defined);
                }
            }
            JsonValue::Object(object) => {
                let mut inner_ns = namespace.map(str::to_string);
                if is_named_definition(object) {
                    let name = object.get("name").and_then(JsonValue::as_str).unwrap_or("");
                    let explicit_ns = object.get("namespace").and_then(JsonValue::as_str);
                    let full = full_name(name, explicit_ns.or(namespace));
                    inner_ns = namespace_of(&full).map(str::to_string);
                    defined.insert(full);
                }
                self.inline_children(schema, inner_ns.as_deref(), defined);
            }
            _ => {}
        }
    }

    fn inline_children(
        &self,
        schema: &mut JsonValue,
        namespace: Option<&str>,
        defined: &mut HashSet<String>,
    ) {
        let JsonValue::Object(object) = schema else {
            return;
        };
        for key in ["items", "values"] {
            if let Some(child) = object.get_mut(key) {
                self.inline(child, namespace, defined);
            }
        }
        if let Some(JsonValue::Array(fields)) = object.get_mut("fields") {
            for field in fields {
                if let Some(ty) = field.get_mut("type") {
                    self.inline(ty, namespace, defined);
                }
            }
        }
        if let Some(ty) = object.get_mut("type") {
            if !ty.is_string() {
                self.inline(ty, namespace, defined);
            }
        }
    }
}

/// Avro conversion over every Avro schema of a generation.
#[derive(Debug, Default)]
pub struct AvroStrategy {
    schemas: BTreeMap<String, AvroArtifact>,
}

impl AvroStrategy {
    /// Load every Avro schema in the context's catalog.
    ///
    /// Dependencies missing from the catalog, or whose files cannot be read,
    /// are skipped; they only matter if the schema references their types.
    pub fn load(ctx: &mut LoadContext<'_>) -> Self {
        let schemas = ctx.load_each(SchemaFormat::Avro, |ctx, entry| {
            let catalog = ctx.catalog();
            let source = read_schema_file(catalog.schema_dir(&entry.id), entry)?;

            let mut dependencies = Vec::new();
            for dependency in ctx.closure(&entry.id) {
                let Some(dep_entry) = catalog.get(dependency) else {
                    tracing::warn!(
                        schema = %entry.id,
                        dependency = %dependency,
                        "avro dependency missing from catalog"
                    );
                    continue;
                };
                match read_schema_file(catalog.schema_dir(dependency), dep_entry) {
                    Ok(text) => dependencies.push(text),
                    Err(e) => tracing::warn!(
                        schema = %entry.id,
                        dependency = %dependency,
                        error = %e,
                        "avro dependency not readable"
                    ),
                }
            }

            AvroArtifact::parse(&entry.id, &source, &dependencies)
        });

        Self { schemas }
    }

    /// Build a strategy from already parsed artifacts.
    pub fn from_artifacts(schemas: BTreeMap<String, AvroArtifact>) -> Self {
        Self { schemas }
    }

    fn resolve(&self, schema_id: &str, message: Option<&str>) -> Result<&AvroArtifact> {
        let artifact = artifact(&self.schemas, schema_id)?;
        artifact.index.resolve(schema_id, message)?;
        Ok(artifact)
    }
}

fn read_schema_file(dir: std::path::PathBuf, entry: &SchemaEntry) -> Result<String> {
    let path = dir.join(&entry.filename);
    fs::read_to_string(&path).map_err(|e| {
        RegistryError::load_failure(&entry.id, format!("cannot read {}: {e}", path.display()))
    })
}

fn codec_from_params(params: &Parameters) -> Result<Codec> {
    match params.get(AVRO_CODEC).map(str::trim).unwrap_or("null") {
        name if name.eq_ignore_ascii_case("null") => Ok(Codec::Null),
        name if name.eq_ignore_ascii_case("deflate") => Ok(Codec::Deflate),
        other => Err(RegistryError::invalid_input(
            "avro",
            format!("unsupported avro codec '{other}'"),
        )),
    }
}

/// A failing source or sink stays an I/O error; truncated or corrupt data is
/// the caller's input.
fn avro_error(err: apache_avro::Error) -> RegistryError {
    let io_kind = std::error::Error::source(&err)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .map(std::io::Error::kind);
    match io_kind {
        Some(kind)
            if !matches!(
                kind,
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData
            ) =>
        {
            RegistryError::Io {
                kind,
                message: err.to_string(),
            }
        }
        _ => RegistryError::invalid_input("avro", err.to_string()),
    }
}

fn write_json_line(codec: &AvroJson<'_>, output: &mut dyn Write, value: AvroValue) -> Result<()> {
    let json = codec.to_json(value)?;
    serde_json::to_writer(&mut *output, &json).map_err(|e| json_error("avro", e))?;
    output.write_all(b"\n")?;
    Ok(())
}

impl FormatStrategy for AvroStrategy {
    fn format(&self) -> SchemaFormat {
        SchemaFormat::Avro
    }

    fn serialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        let artifact = self.resolve(schema_id, message)?;
        let text = AvroJson::new(&artifact.schema)?;

        if params.is(AVRO_PAYLOAD, "file") {
            let codec = codec_from_params(params)?;
            let mut writer = Writer::with_codec(&artifact.schema, &mut *output, codec);
            for json in serde_json::Deserializer::from_reader(input).into_iter::<JsonValue>() {
                let json = json.map_err(|e| json_error("avro", e))?;
                writer.append(text.to_avro(&json)?).map_err(avro_error)?;
            }
            writer.into_inner().map_err(avro_error)?;
        } else {
            let json: JsonValue =
                serde_json::from_reader(input).map_err(|e| json_error("avro", e))?;
            let datum =
                to_avro_datum(&artifact.schema, text.to_avro(&json)?).map_err(avro_error)?;
            output.write_all(&datum)?;
        }

        output.flush()?;
        Ok(())
    }

    fn deserialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        mut input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        let artifact = self.resolve(schema_id, message)?;

        if params.is(AVRO_PAYLOAD, "file") {
            // Container files carry their writer schema; it alone drives decoding.
            let reader = Reader::new(input).map_err(avro_error)?;
            let writer_schema = reader.writer_schema().clone();
            let text = AvroJson::new(&writer_schema)?;
            for value in reader {
                write_json_line(&text, output, value.map_err(avro_error)?)?;
            }
        } else {
            let value =
                from_avro_datum(&artifact.schema, &mut input, None).map_err(avro_error)?;
            let json = AvroJson::new(&artifact.schema)?.to_json(value)?;
            serde_json::to_writer(&mut *output, &json).map_err(|e| json_error("avro", e))?;
        }

        output.flush()?;
        Ok(())
    }

    fn message_index(&self, schema_id: &str) -> Option<&MessageIndex> {
        self.schemas.get(schema_id).map(AvroArtifact::index)
    }

    fn loaded_schemas(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }
}
