// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Avro JSON encoding, the text form of Avro data.
//!
//! - union values other than `null` are wrapped in a single-key object whose
//!   key names the branch (`{"int": 7}`, `{"example.Address": {...}}`)
//! - `bytes` and `fixed` values are strings whose characters are the byte
//!   values (ISO-8859-1)
//!
//! Untagged union values are also accepted on input; the first non-null
//! branch that accepts the value is chosen.

use std::collections::HashMap;

use apache_avro::schema::{NamesRef, ResolvedSchema, Schema, UnionSchema};
use apache_avro::types::Value as AvroValue;
use serde_json::{Map, Value as JsonValue};

use crate::core::{RegistryError, Result};

type Conversion<T> = std::result::Result<T, String>;

/// Schema-driven conversion between JSON and Avro values.
pub struct AvroJson<'s> {
    schema: &'s Schema,
    names: NamesRef<'s>,
}

impl<'s> AvroJson<'s> {
    /// Prepare conversions for `schema`, resolving its named types.
    pub fn new(schema: &'s Schema) -> Result<Self> {
        let resolved = ResolvedSchema::try_from(schema)
            .map_err(|e| RegistryError::invalid_input("avro", e.to_string()))?;
        Ok(Self {
            schema,
            names: resolved.get_names().clone(),
        })
    }

    /// Convert a JSON document into an Avro value of the schema.
    pub fn to_avro(&self, json: &JsonValue) -> Result<AvroValue> {
        self.value(json, self.schema, false)
            .map_err(|e| RegistryError::invalid_input("avro", e))
    }

    /// Convert an Avro value of the schema into its JSON document.
    pub fn to_json(&self, value: AvroValue) -> Result<JsonValue> {
        self.json(value, self.schema)
            .map_err(|e| RegistryError::invalid_input("avro", e))
    }

    fn deref<'a>(&'a self, schema: &'a Schema) -> Conversion<&'a Schema> {
        match schema {
            Schema::Ref { name } => self
                .names
                .get(name)
                .copied()
                .ok_or_else(|| format!("unresolved type '{}'", name.fullname(None))),
            other => Ok(other),
        }
    }

    /// `default` selects the rules for field defaults: a union default is
    /// an untagged value of the first branch.
    fn value(&self, json: &JsonValue, schema: &Schema, default: bool) -> Conversion<AvroValue> {
        let schema = self.deref(schema)?;
        match schema {
            Schema::Null => match json {
                JsonValue::Null => Ok(AvroValue::Null),
                other => Err(mismatch("null", other)),
            },
            Schema::Boolean => json
                .as_bool()
                .map(AvroValue::Boolean)
                .ok_or_else(|| mismatch("boolean", json)),
            Schema::Int => int(json).map(AvroValue::Int),
            Schema::Long => long(json).map(AvroValue::Long),
            Schema::Float => double(json).map(|d| AvroValue::Float(d as f32)),
            Schema::Double => double(json).map(AvroValue::Double),
            Schema::Bytes => latin1(json).map(AvroValue::Bytes),
            Schema::String => json
                .as_str()
                .map(|s| AvroValue::String(s.to_string()))
                .ok_or_else(|| mismatch("string", json)),
            Schema::Array(items) => {
                let JsonValue::Array(elements) = json else {
                    return Err(mismatch("array", json));
                };
                elements
                    .iter()
                    .map(|element| self.value(element, items, default))
                    .collect::<Conversion<Vec<_>>>()
                    .map(AvroValue::Array)
            }
            Schema::Map(values) => {
                let JsonValue::Object(object) = json else {
                    return Err(mismatch("map", json));
                };
                object
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.value(value, values, default)?)))
                    .collect::<Conversion<HashMap<_, _>>>()
                    .map(AvroValue::Map)
            }
            Schema::Union(union) => self.union_value(json, union, default),
            Schema::Record(record) => {
                let JsonValue::Object(object) = json else {
                    return Err(mismatch(&record.name.fullname(None), json));
                };
                let mut fields = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let value = match (object.get(&field.name), &field.default) {
                        (Some(value), _) => self.value(value, &field.schema, default),
                        (None, Some(fallback)) => self.value(fallback, &field.schema, true),
                        (None, None) => return Err(format!("missing field '{}'", field.name)),
                    }
                    .map_err(|e| format!("{}: {e}", field.name))?;
                    fields.push((field.name.clone(), value));
                }
                Ok(AvroValue::Record(fields))
            }
            Schema::Enum(enumeration) => {
                let symbol = json.as_str().ok_or_else(|| mismatch("enum symbol", json))?;
                enumeration
                    .symbols
                    .iter()
                    .position(|s| s == symbol)
                    .map(|index| AvroValue::Enum(index as u32, symbol.to_string()))
                    .ok_or_else(|| {
                        format!(
                            "'{symbol}' is not a symbol of {}",
                            enumeration.name.fullname(None)
                        )
                    })
            }
            Schema::Fixed(fixed) => {
                let bytes = latin1(json)?;
                if bytes.len() != fixed.size {
                    return Err(format!(
                        "{} needs {} bytes, found {}",
                        fixed.name.fullname(None),
                        fixed.size,
                        bytes.len()
                    ));
                }
                Ok(AvroValue::Fixed(fixed.size, bytes))
            }
            Schema::Decimal(_) => logical(AvroValue::Bytes(latin1(json)?), schema),
            Schema::Duration => {
                let bytes = latin1(json)?;
                logical(AvroValue::Fixed(bytes.len(), bytes), schema)
            }
            Schema::Uuid => {
                let text = json.as_str().ok_or_else(|| mismatch("uuid", json))?;
                logical(AvroValue::String(text.to_string()), schema)
            }
            Schema::Date | Schema::TimeMillis => logical(AvroValue::Int(int(json)?), schema),
            Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros => logical(AvroValue::Long(long(json)?), schema),
            Schema::Ref { name } => Err(format!("unresolved type '{}'", name.fullname(None))),
        }
    }

    fn union_value(
        &self,
        json: &JsonValue,
        union: &UnionSchema,
        default: bool,
    ) -> Conversion<AvroValue> {
        let branches = union.variants();
        let tagged = |index: usize, value: AvroValue| AvroValue::Union(index as u32, Box::new(value));

        if default {
            let first = branches.first().ok_or("empty union")?;
            return self.value(json, first, true).map(|value| tagged(0, value));
        }

        if json.is_null() {
            return branches
                .iter()
                .position(|branch| matches!(branch, Schema::Null))
                .map(|index| tagged(index, AvroValue::Null))
                .ok_or_else(|| "null is not a branch of the union".to_string());
        }

        if let JsonValue::Object(object) = json {
            if let (1, Some((tag, inner))) = (object.len(), object.iter().next()) {
                if let Some(index) = branches
                    .iter()
                    .position(|branch| self.branch_matches(branch, tag))
                {
                    return self
                        .value(inner, &branches[index], false)
                        .map(|value| tagged(index, value))
                        .map_err(|e| format!("{tag}: {e}"));
                }
            }
        }

        branches
            .iter()
            .enumerate()
            .filter(|(_, branch)| !matches!(branch, Schema::Null))
            .find_map(|(index, branch)| {
                self.value(json, branch, false)
                    .ok()
                    .map(|value| tagged(index, value))
            })
            .ok_or_else(|| {
                let names: Vec<String> = branches.iter().map(|b| self.branch_name(b)).collect();
                format!("value matches no branch of [{}]", names.join(", "))
            })
    }

    /// Branch key used in the tagged union form.
    fn branch_name(&self, schema: &Schema) -> String {
        match schema {
            Schema::Null => "null".into(),
            Schema::Boolean => "boolean".into(),
            Schema::Int | Schema::Date | Schema::TimeMillis => "int".into(),
            Schema::Long
            | Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros => "long".into(),
            Schema::Float => "float".into(),
            Schema::Double => "double".into(),
            Schema::Bytes => "bytes".into(),
            Schema::String | Schema::Uuid => "string".into(),
            Schema::Array(_) => "array".into(),
            Schema::Map(_) => "map".into(),
            Schema::Union(_) => "union".into(),
            Schema::Duration => "fixed".into(),
            Schema::Decimal(decimal) => self.branch_name(&decimal.inner),
            Schema::Record(record) => record.name.fullname(None),
            Schema::Enum(enumeration) => enumeration.name.fullname(None),
            Schema::Fixed(fixed) => fixed.name.fullname(None),
            Schema::Ref { name } => name.fullname(None),
        }
    }

    /// Named branches also answer to their simple name.
    fn branch_matches(&self, schema: &Schema, tag: &str) -> bool {
        let name = self.branch_name(schema);
        name == tag || name.rsplit_once('.').is_some_and(|(_, simple)| simple == tag)
    }

    fn json(&self, value: AvroValue, schema: &Schema) -> Conversion<JsonValue> {
        let schema = self.deref(schema)?;
        match (value, schema) {
            (AvroValue::Union(index, inner), Schema::Union(union)) => {
                if matches!(*inner, AvroValue::Null) {
                    return Ok(JsonValue::Null);
                }
                let branch = union
                    .variants()
                    .get(index as usize)
                    .ok_or_else(|| format!("union branch {index} out of range"))?;
                let mut object = Map::new();
                object.insert(self.branch_name(branch), self.json(*inner, branch)?);
                Ok(JsonValue::Object(object))
            }
            (AvroValue::Bytes(bytes), _) | (AvroValue::Fixed(_, bytes), _) => {
                Ok(JsonValue::String(latin1_string(&bytes)))
            }
            (AvroValue::Decimal(decimal), _) => Vec::<u8>::try_from(&decimal)
                .map(|bytes| JsonValue::String(latin1_string(&bytes)))
                .map_err(|e| e.to_string()),
            (AvroValue::Duration(duration), _) => Ok(JsonValue::String(latin1_string(
                &<[u8; 12]>::from(duration),
            ))),
            (AvroValue::Array(items), Schema::Array(item_schema)) => items
                .into_iter()
                .map(|item| self.json(item, item_schema))
                .collect::<Conversion<Vec<_>>>()
                .map(JsonValue::Array),
            (AvroValue::Map(entries), Schema::Map(value_schema)) => {
                let mut object = Map::new();
                for (key, value) in entries {
                    object.insert(key, self.json(value, value_schema)?);
                }
                Ok(JsonValue::Object(object))
            }
            (AvroValue::Record(fields), Schema::Record(record)) => {
                let mut object = Map::new();
                for (name, value) in fields {
                    let field = record
                        .lookup
                        .get(&name)
                        .and_then(|&position| record.fields.get(position))
                        .ok_or_else(|| format!("field '{name}' not in {}", record.name.fullname(None)))?;
                    object.insert(name, self.json(value, &field.schema)?);
                }
                Ok(JsonValue::Object(object))
            }
            (other, _) => JsonValue::try_from(other).map_err(|e| e.to_string()),
        }
    }
}

fn logical(value: AvroValue, schema: &Schema) -> Conversion<AvroValue> {
    value.resolve(schema).map_err(|e| e.to_string())
}

fn kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn mismatch(expected: &str, found: &JsonValue) -> String {
    format!("expected {expected}, found {}", kind(found))
}

fn int(json: &JsonValue) -> Conversion<i32> {
    json.as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| mismatch("int", json))
}

fn long(json: &JsonValue) -> Conversion<i64> {
    json.as_i64().ok_or_else(|| mismatch("long", json))
}

fn double(json: &JsonValue) -> Conversion<f64> {
    match json {
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| mismatch("double", json)),
        JsonValue::String(s) if s == "NaN" => Ok(f64::NAN),
        JsonValue::String(s) if s == "Infinity" => Ok(f64::INFINITY),
        JsonValue::String(s) if s == "-Infinity" => Ok(f64::NEG_INFINITY),
        other => Err(mismatch("double", other)),
    }
}

fn latin1(json: &JsonValue) -> Conversion<Vec<u8>> {
    let text = json.as_str().ok_or_else(|| mismatch("bytes", json))?;
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| format!("'{c}' is not an ISO-8859-1 byte")))
        .collect()
}

fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
