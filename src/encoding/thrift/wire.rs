// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Descriptor-driven struct encoding over the `thrift` crate's protocols.
//!
//! Works with any [`TInputProtocol`] / [`TOutputProtocol`]; the strategy
//! picks binary or compact. Fields are written in declaration order. On
//! read, unknown fields and fields whose wire type does not match the
//! declaration are skipped.

use thrift::protocol::{
    TFieldIdentifier, TInputProtocol, TListIdentifier, TMapIdentifier, TOutputProtocol,
    TSetIdentifier, TStructIdentifier, TType,
};
use thrift::{Error as ThriftError, TransportErrorKind};

use super::value::{wire_type, StructValue, ThriftValue};
use crate::core::{RegistryError, Result};
use crate::schema::loader::thrift::{StructDef, ThriftType, TypeTable};

/// Upper bound on capacity reserved up front for a container.
const MAX_PREALLOCATE: usize = 1024;

/// Map a protocol error, keeping transport failures other than a premature
/// end of input as I/O errors.
pub fn thrift_error(err: ThriftError) -> RegistryError {
    match err {
        ThriftError::Transport(e) if e.kind != TransportErrorKind::EndOfFile => {
            RegistryError::Io {
                kind: std::io::ErrorKind::Other,
                message: e.message,
            }
        }
        ThriftError::Transport(e) => {
            RegistryError::invalid_input("thrift", format!("unexpected end of input: {}", e.message))
        }
        other => RegistryError::invalid_input("thrift", other.to_string()),
    }
}

fn mismatch(value: &ThriftValue, ty: &ThriftType) -> RegistryError {
    RegistryError::invalid_input(
        "thrift",
        format!("value {value:?} does not match declared type {ty:?}"),
    )
}

// ============================================================================
// Writing
// ============================================================================

/// Write `value` as struct `def`.
pub fn write_struct(
    proto: &mut dyn TOutputProtocol,
    value: &StructValue,
    def: &StructDef,
    types: &TypeTable,
) -> Result<()> {
    proto
        .write_struct_begin(&TStructIdentifier::new(def.name.as_str()))
        .map_err(thrift_error)?;

    for field in &def.fields {
        let Some(field_value) = value.fields.get(&field.id) else {
            continue;
        };
        proto
            .write_field_begin(&TFieldIdentifier::new(
                field.name.as_str(),
                wire_type(&field.ty),
                field.id,
            ))
            .map_err(thrift_error)?;
        write_value(proto, field_value, &field.ty, types)?;
        proto.write_field_end().map_err(thrift_error)?;
    }

    proto.write_field_stop().map_err(thrift_error)?;
    proto.write_struct_end().map_err(thrift_error)
}

fn container_len(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| RegistryError::invalid_input("thrift", format!("container of {len} elements")))
}

fn write_value(
    proto: &mut dyn TOutputProtocol,
    value: &ThriftValue,
    ty: &ThriftType,
    types: &TypeTable,
) -> Result<()> {
    match (value, ty) {
        (ThriftValue::Bool(v), ThriftType::Bool) => proto.write_bool(*v),
        (ThriftValue::Byte(v), ThriftType::Byte) => proto.write_i8(*v),
        (ThriftValue::I16(v), ThriftType::I16) => proto.write_i16(*v),
        (ThriftValue::I32(v), ThriftType::I32) => proto.write_i32(*v),
        (ThriftValue::I64(v), ThriftType::I64) => proto.write_i64(*v),
        (ThriftValue::Double(v), ThriftType::Double) => proto.write_double(*v),
        (ThriftValue::String(v), ThriftType::String) => proto.write_string(v),
        (ThriftValue::Binary(v), ThriftType::Binary) => proto.write_bytes(v),
        (ThriftValue::Struct(inner), ThriftType::Struct(name)) => {
            return write_struct(proto, inner, types.require(name)?, types);
        }
        (ThriftValue::List(items), ThriftType::List(elem)) => {
            proto
                .write_list_begin(&TListIdentifier::new(
                    wire_type(elem),
                    container_len(items.len())?,
                ))
                .map_err(thrift_error)?;
            for item in items {
                write_value(proto, item, elem, types)?;
            }
            proto.write_list_end()
        }
        (ThriftValue::Set(items), ThriftType::Set(elem)) => {
            proto
                .write_set_begin(&TSetIdentifier::new(
                    wire_type(elem),
                    container_len(items.len())?,
                ))
                .map_err(thrift_error)?;
            for item in items {
                write_value(proto, item, elem, types)?;
            }
            proto.write_set_end()
        }
        (ThriftValue::Map(pairs), ThriftType::Map(key_ty, value_ty)) => {
            proto
                .write_map_begin(&TMapIdentifier::new(
                    wire_type(key_ty),
                    wire_type(value_ty),
                    container_len(pairs.len())?,
                ))
                .map_err(thrift_error)?;
            for (key, item) in pairs {
                write_value(proto, key, key_ty, types)?;
                write_value(proto, item, value_ty, types)?;
            }
            proto.write_map_end()
        }
        (value, ty) => return Err(mismatch(value, ty)),
    }
    .map_err(thrift_error)
}

// ============================================================================
// Reading
// ============================================================================

/// Read one struct of type `def`.
pub fn read_struct(
    proto: &mut dyn TInputProtocol,
    def: &StructDef,
    types: &TypeTable,
) -> Result<StructValue> {
    proto.read_struct_begin().map_err(thrift_error)?;

    let mut value = StructValue::default();
    loop {
        let header = proto.read_field_begin().map_err(thrift_error)?;
        if header.field_type == TType::Stop {
            break;
        }

        let declared = header
            .id
            .and_then(|id| def.field(id))
            .filter(|field| wire_type(&field.ty) == header.field_type);
        match declared {
            Some(field) => {
                let field_value = read_value(proto, &field.ty, types)?;
                value.fields.insert(field.id, field_value);
            }
            None => proto.skip(header.field_type).map_err(thrift_error)?,
        }
        proto.read_field_end().map_err(thrift_error)?;
    }

    proto.read_struct_end().map_err(thrift_error)?;
    value.validate(def)?;
    Ok(value)
}

fn check_element(found: Option<TType>, expected: &ThriftType, size: i32) -> Result<usize> {
    let size = usize::try_from(size).map_err(|_| {
        RegistryError::invalid_input("thrift", format!("negative container size {size}"))
    })?;
    if size > 0 && found != Some(wire_type(expected)) {
        return Err(RegistryError::invalid_input(
            "thrift",
            format!(
                "container element type {found:?} does not match {:?}",
                wire_type(expected)
            ),
        ));
    }
    Ok(size)
}

fn read_value(
    proto: &mut dyn TInputProtocol,
    ty: &ThriftType,
    types: &TypeTable,
) -> Result<ThriftValue> {
    let value = match ty {
        ThriftType::Bool => ThriftValue::Bool(proto.read_bool().map_err(thrift_error)?),
        ThriftType::Byte => ThriftValue::Byte(proto.read_i8().map_err(thrift_error)?),
        ThriftType::I16 => ThriftValue::I16(proto.read_i16().map_err(thrift_error)?),
        ThriftType::I32 => ThriftValue::I32(proto.read_i32().map_err(thrift_error)?),
        ThriftType::I64 => ThriftValue::I64(proto.read_i64().map_err(thrift_error)?),
        ThriftType::Double => ThriftValue::Double(proto.read_double().map_err(thrift_error)?),
        ThriftType::String => ThriftValue::String(proto.read_string().map_err(thrift_error)?),
        ThriftType::Binary => ThriftValue::Binary(proto.read_bytes().map_err(thrift_error)?),
        ThriftType::Struct(name) => {
            ThriftValue::Struct(read_struct(proto, types.require(name)?, types)?)
        }
        ThriftType::List(elem) => {
            let header = proto.read_list_begin().map_err(thrift_error)?;
            let size = check_element(Some(header.element_type), elem, header.size)?;
            let mut items = Vec::with_capacity(size.min(MAX_PREALLOCATE));
            for _ in 0..size {
                items.push(read_value(proto, elem, types)?);
            }
            proto.read_list_end().map_err(thrift_error)?;
            ThriftValue::List(items)
        }
        ThriftType::Set(elem) => {
            let header = proto.read_set_begin().map_err(thrift_error)?;
            let size = check_element(Some(header.element_type), elem, header.size)?;
            let mut items = Vec::with_capacity(size.min(MAX_PREALLOCATE));
            for _ in 0..size {
                items.push(read_value(proto, elem, types)?);
            }
            proto.read_set_end().map_err(thrift_error)?;
            ThriftValue::Set(items)
        }
        ThriftType::Map(key_ty, value_ty) => {
            let header = proto.read_map_begin().map_err(thrift_error)?;
            let size = check_element(header.key_type, key_ty, header.size)?;
            check_element(header.value_type, value_ty, header.size)?;
            let mut pairs = Vec::with_capacity(size.min(MAX_PREALLOCATE));
            for _ in 0..size {
                let key = read_value(proto, key_ty, types)?;
                let item = read_value(proto, value_ty, types)?;
                pairs.push((key, item));
            }
            proto.read_map_end().map_err(thrift_error)?;
            ThriftValue::Map(pairs)
        }
    };
    Ok(value)
}
