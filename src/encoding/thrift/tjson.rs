// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Thrift JSON protocol text form.
//!
//! Layout, as produced by `TJSONProtocol`:
//! - struct: `{"<id>":{"<tag>":<value>},...}`
//! - list / set: `["<tag>",<count>,<elem>,...]`
//! - map: `["<ktag>","<vtag>",<count>,{"<key>":<value>,...}]`
//! - bool as `1`/`0`, binary as unpadded base64, non-finite doubles and
//!   every map key as strings
//!
//! Reading is descriptor-driven: fields whose ID is unknown or whose tag does
//! not match the declared type are skipped.

use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use serde_json::Value as JsonValue;

use super::value::{json_tag, StructValue, ThriftValue};
use crate::core::{RegistryError, Result};
use crate::schema::loader::thrift::{StructDef, ThriftType, TypeTable};

fn invalid(message: impl Into<String>) -> RegistryError {
    RegistryError::invalid_input("thrift", message)
}

// ============================================================================
// Reading
// ============================================================================

/// Read a struct from its TJSON form.
pub fn read_struct(json: &JsonValue, def: &StructDef, types: &TypeTable) -> Result<StructValue> {
    let object = json
        .as_object()
        .ok_or_else(|| invalid(format!("expected object for {}", def.name)))?;

    let mut value = StructValue::default();
    for (key, entry) in object {
        let id: i16 = key
            .parse()
            .map_err(|_| invalid(format!("invalid field id '{key}' in {}", def.name)))?;
        let Some(field) = def.field(id) else {
            continue;
        };
        let Some((tag, inner)) = single_entry(entry) else {
            return Err(invalid(format!(
                "field {id} of {} must be a single-entry object",
                def.name
            )));
        };
        if tag != json_tag(&field.ty) {
            tracing::debug!(
                message_type = %def.name,
                field = id,
                expected = json_tag(&field.ty),
                found = %tag,
                "skipping field with mismatched type"
            );
            continue;
        }
        value
            .fields
            .insert(id, read_value(inner, &field.ty, types)?);
    }

    value.validate(def)?;
    Ok(value)
}

fn single_entry(json: &JsonValue) -> Option<(&str, &JsonValue)> {
    let object = json.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.iter().next().map(|(k, v)| (k.as_str(), v))
}

fn read_value(json: &JsonValue, ty: &ThriftType, types: &TypeTable) -> Result<ThriftValue> {
    match ty {
        ThriftType::Bool => match json {
            JsonValue::Bool(b) => Ok(ThriftValue::Bool(*b)),
            other => Ok(ThriftValue::Bool(read_integer(other, "bool")? != 0)),
        },
        ThriftType::Byte => Ok(ThriftValue::Byte(narrow(read_integer(json, "i8")?, "i8")?)),
        ThriftType::I16 => Ok(ThriftValue::I16(narrow(read_integer(json, "i16")?, "i16")?)),
        ThriftType::I32 => Ok(ThriftValue::I32(narrow(read_integer(json, "i32")?, "i32")?)),
        ThriftType::I64 => Ok(ThriftValue::I64(read_integer(json, "i64")?)),
        ThriftType::Double => read_double(json).map(ThriftValue::Double),
        ThriftType::String => json
            .as_str()
            .map(|s| ThriftValue::String(s.to_string()))
            .ok_or_else(|| invalid("expected string")),
        ThriftType::Binary => {
            let text = json.as_str().ok_or_else(|| invalid("expected base64 string"))?;
            decode_base64(text).map(ThriftValue::Binary)
        }
        ThriftType::Struct(name) => {
            let def = types.require(name)?;
            read_struct(json, def, types).map(ThriftValue::Struct)
        }
        ThriftType::List(elem) => read_sequence(json, elem, types).map(ThriftValue::List),
        ThriftType::Set(elem) => read_sequence(json, elem, types).map(ThriftValue::Set),
        ThriftType::Map(key, value) => read_map(json, key, value, types),
    }
}

fn read_integer(json: &JsonValue, what: &str) -> Result<i64> {
    match json {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(format!("expected {what}, found {json}")))
}

fn narrow<T: TryFrom<i64>>(value: i64, what: &str) -> Result<T> {
    T::try_from(value).map_err(|_| invalid(format!("{value} out of range for {what}")))
}

fn read_double(json: &JsonValue) -> Result<f64> {
    match json {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
    .ok_or_else(|| invalid(format!("expected double, found {json}")))
}

fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD_NO_PAD
        .decode(text.trim_end_matches('='))
        .map_err(|e| invalid(format!("invalid base64: {e}")))
}

fn container<'a>(json: &'a JsonValue, tags: &[&str]) -> Result<(usize, &'a [JsonValue])> {
    let items = json
        .as_array()
        .ok_or_else(|| invalid("expected container array"))?;
    if items.len() < tags.len() + 1 {
        return Err(invalid("container header too short"));
    }
    for (position, expected) in tags.iter().enumerate() {
        if items[position].as_str() != Some(*expected) {
            return Err(invalid(format!(
                "container element type {} does not match {expected}",
                items[position]
            )));
        }
    }
    let count = items[tags.len()]
        .as_u64()
        .ok_or_else(|| invalid("container size must be a non-negative integer"))?;
    Ok((count as usize, &items[tags.len() + 1..]))
}

fn read_sequence(
    json: &JsonValue,
    elem: &ThriftType,
    types: &TypeTable,
) -> Result<Vec<ThriftValue>> {
    let (count, items) = container(json, &[json_tag(elem)])?;
    if items.len() != count {
        return Err(invalid(format!(
            "container declares {count} elements but holds {}",
            items.len()
        )));
    }
    items
        .iter()
        .map(|item| read_value(item, elem, types))
        .collect()
}

fn read_map(
    json: &JsonValue,
    key_ty: &ThriftType,
    value_ty: &ThriftType,
    types: &TypeTable,
) -> Result<ThriftValue> {
    let (count, rest) = container(json, &[json_tag(key_ty), json_tag(value_ty)])?;
    let entries = match rest {
        [] if count == 0 => return Ok(ThriftValue::Map(Vec::new())),
        [JsonValue::Object(entries)] => entries,
        _ => return Err(invalid("map body must be a single object")),
    };
    if entries.len() != count {
        return Err(invalid(format!(
            "map declares {count} entries but holds {}",
            entries.len()
        )));
    }

    let mut pairs = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        pairs.push((read_key(key, key_ty)?, read_value(value, value_ty, types)?));
    }
    Ok(ThriftValue::Map(pairs))
}

fn read_key(key: &str, ty: &ThriftType) -> Result<ThriftValue> {
    let as_json = JsonValue::String(key.to_string());
    match ty {
        ThriftType::String => Ok(ThriftValue::String(key.to_string())),
        ThriftType::Bool
        | ThriftType::Byte
        | ThriftType::I16
        | ThriftType::I32
        | ThriftType::I64
        | ThriftType::Double
        | ThriftType::Binary => read_value(&as_json, ty, &TypeTable::default()),
        _ => Err(invalid(format!(
            "map keys of type {} are not supported",
            json_tag(ty)
        ))),
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Write a struct in compact TJSON form, fields in declaration order.
pub fn write_struct(
    out: &mut String,
    value: &StructValue,
    def: &StructDef,
    types: &TypeTable,
) -> Result<()> {
    out.push('{');
    let mut first = true;
    for field in &def.fields {
        let Some(field_value) = value.fields.get(&field.id) else {
            continue;
        };
        if !first {
            out.push(',');
        }
        first = false;
        let _ = write!(out, "\"{}\":{{\"{}\":", field.id, json_tag(&field.ty));
        write_value(out, field_value, &field.ty, types)?;
        out.push('}');
    }
    out.push('}');
    Ok(())
}

fn write_value(
    out: &mut String,
    value: &ThriftValue,
    ty: &ThriftType,
    types: &TypeTable,
) -> Result<()> {
    match (value, ty) {
        (ThriftValue::Bool(b), _) => out.push(if *b { '1' } else { '0' }),
        (ThriftValue::Byte(v), _) => {
            let _ = write!(out, "{v}");
        }
        (ThriftValue::I16(v), _) => {
            let _ = write!(out, "{v}");
        }
        (ThriftValue::I32(v), _) => {
            let _ = write!(out, "{v}");
        }
        (ThriftValue::I64(v), _) => {
            let _ = write!(out, "{v}");
        }
        (ThriftValue::Double(v), _) => write_double(out, *v),
        (ThriftValue::String(s), _) => write_string(out, s),
        (ThriftValue::Binary(bytes), _) => {
            out.push('"');
            out.push_str(&STANDARD_NO_PAD.encode(bytes));
            out.push('"');
        }
        (ThriftValue::Struct(inner), ThriftType::Struct(name)) => {
            write_struct(out, inner, types.require(name)?, types)?;
        }
        (ThriftValue::List(items), ThriftType::List(elem))
        | (ThriftValue::Set(items), ThriftType::Set(elem)) => {
            let _ = write!(out, "[\"{}\",{}", json_tag(elem), items.len());
            for item in items {
                out.push(',');
                write_value(out, item, elem, types)?;
            }
            out.push(']');
        }
        (ThriftValue::Map(pairs), ThriftType::Map(key_ty, value_ty)) => {
            let _ = write!(
                out,
                "[\"{}\",\"{}\",{},{{",
                json_tag(key_ty),
                json_tag(value_ty),
                pairs.len()
            );
            for (position, (key, item)) in pairs.iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                write_key(out, key)?;
                out.push(':');
                write_value(out, item, value_ty, types)?;
            }
            out.push_str("}]");
        }
        (value, ty) => {
            return Err(invalid(format!(
                "value {value:?} does not match type {}",
                json_tag(ty)
            )));
        }
    }
    Ok(())
}

fn write_double(out: &mut String, value: f64) {
    if value.is_nan() {
        out.push_str("\"NaN\"");
    } else if value.is_infinite() {
        out.push_str(if value > 0.0 {
            "\"Infinity\""
        } else {
            "\"-Infinity\""
        });
    } else {
        out.push_str(&JsonValue::from(value).to_string());
    }
}

fn write_string(out: &mut String, value: &str) {
    out.push_str(&JsonValue::String(value.to_string()).to_string());
}

fn write_key(out: &mut String, key: &ThriftValue) -> Result<()> {
    match key {
        ThriftValue::String(s) => write_string(out, s),
        ThriftValue::Bool(b) => out.push_str(if *b { "\"1\"" } else { "\"0\"" }),
        ThriftValue::Byte(v) => {
            let _ = write!(out, "\"{v}\"");
        }
        ThriftValue::I16(v) => {
            let _ = write!(out, "\"{v}\"");
        }
        ThriftValue::I32(v) => {
            let _ = write!(out, "\"{v}\"");
        }
        ThriftValue::I64(v) => {
            let _ = write!(out, "\"{v}\"");
        }
        ThriftValue::Double(v) => {
            let mut number = String::new();
            write_double(&mut number, *v);
            if number.starts_with('"') {
                out.push_str(&number);
            } else {
                let _ = write!(out, "\"{number}\"");
            }
        }
        ThriftValue::Binary(bytes) => {
            let _ = write!(out, "\"{}\"", STANDARD_NO_PAD.encode(bytes));
        }
        other => {
            return Err(invalid(format!("unsupported map key {other:?}")));
        }
    }
    Ok(())
}
