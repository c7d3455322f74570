// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dynamic Thrift values.

use std::collections::BTreeMap;

use thrift::protocol::TType;

use crate::core::{RegistryError, Result};
use crate::schema::loader::thrift::{StructDef, StructKind, ThriftType};

/// A decoded Thrift value, typed by the descriptor that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ThriftValue {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Struct(StructValue),
    List(Vec<ThriftValue>),
    Set(Vec<ThriftValue>),
    Map(Vec<(ThriftValue, ThriftValue)>),
}

/// Field values of a struct, union or exception, keyed by field ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructValue {
    pub fields: BTreeMap<i16, ThriftValue>,
}

impl StructValue {
    /// Fail if a field declared `required` is absent, or a union does not
    /// carry exactly one field.
    pub fn validate(&self, def: &StructDef) -> Result<()> {
        for field in def.fields.iter().filter(|field| field.required) {
            if !self.fields.contains_key(&field.id) {
                return Err(RegistryError::invalid_input(
                    "thrift",
                    format!("required field '{}' of {} is missing", field.name, def.name),
                ));
            }
        }
        if def.kind == StructKind::Union && self.fields.len() != 1 {
            return Err(RegistryError::invalid_input(
                "thrift",
                format!(
                    "union {} must set exactly one field, found {}",
                    def.name,
                    self.fields.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Wire type of a descriptor type.
pub fn wire_type(ty: &ThriftType) -> TType {
    match ty {
        ThriftType::Bool => TType::Bool,
        ThriftType::Byte => TType::I08,
        ThriftType::I16 => TType::I16,
        ThriftType::I32 => TType::I32,
        ThriftType::I64 => TType::I64,
        ThriftType::Double => TType::Double,
        ThriftType::String | ThriftType::Binary => TType::String,
        ThriftType::Struct(_) => TType::Struct,
        ThriftType::List(_) => TType::List,
        ThriftType::Set(_) => TType::Set,
        ThriftType::Map(_, _) => TType::Map,
    }
}

/// Type tag used by the Thrift JSON protocol.
pub fn json_tag(ty: &ThriftType) -> &'static str {
    match ty {
        ThriftType::Bool => "tf",
        ThriftType::Byte => "i8",
        ThriftType::I16 => "i16",
        ThriftType::I32 => "i32",
        ThriftType::I64 => "i64",
        ThriftType::Double => "dbl",
        ThriftType::String | ThriftType::Binary => "str",
        ThriftType::Struct(_) => "rec",
        ThriftType::List(_) => "lst",
        ThriftType::Set(_) => "set",
        ThriftType::Map(_, _) => "map",
    }
}
