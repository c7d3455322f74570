// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Thrift artifact loading.
//!
//! Generated artifacts are the JSON program descriptions written by
//! `thrift --gen json` (one `*.json` file per IDL file). Every program on the
//! schema's search path goes into a private [`TypeTable`]. Manifest lines
//! name struct-like types as `program.Name`; exceptions are classified as
//! error-like, everything else that is not a struct, union or exception is
//! rejected with a warning.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;

use serde::Deserialize;

use super::{
    infer_multi_class_default, ArtifactClass, ClassifiedArtifact, MessageIndex, SearchPath,
};
use crate::core::{RegistryError, Result};

/// Program description file extension.
pub const PROGRAM_EXTENSIONS: &[&str] = &["json"];

// ============================================================================
// IDL JSON model
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProgramDoc {
    name: String,
    #[serde(default)]
    enums: Vec<NamedDoc>,
    #[serde(default)]
    typedefs: Vec<NamedDoc>,
    #[serde(default)]
    structs: Vec<StructDoc>,
    #[serde(default)]
    exceptions: Vec<StructDoc>,
    #[serde(default)]
    services: Vec<NamedDoc>,
}

#[derive(Debug, Deserialize)]
struct NamedDoc {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructDoc {
    name: String,
    #[serde(default)]
    is_exception: bool,
    #[serde(default)]
    is_union: bool,
    #[serde(default)]
    fields: Vec<FieldDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldDoc {
    key: i16,
    name: String,
    type_id: String,
    #[serde(default, rename = "type")]
    spec: Option<TypeRefDoc>,
    #[serde(default)]
    required: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeSpecDoc {
    type_id: String,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    elem_type_id: Option<String>,
    #[serde(default)]
    elem_type: Option<TypeRefDoc>,
    #[serde(default)]
    key_type_id: Option<String>,
    #[serde(default)]
    key_type: Option<TypeRefDoc>,
    #[serde(default)]
    value_type_id: Option<String>,
    #[serde(default)]
    value_type: Option<TypeRefDoc>,
}

/// A nested type is either a bare type ID or a full type spec.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeRefDoc {
    Id(String),
    Spec(Box<TypeSpecDoc>),
}

// ============================================================================
// Resolved descriptors
// ============================================================================

/// Field type after resolving the IDL description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThriftType {
    Bool,
    Byte,
    I16,
    /// Also used for enums
    I32,
    I64,
    Double,
    String,
    Binary,
    /// Struct, union or exception, by qualified name
    Struct(String),
    List(Box<ThriftType>),
    Set(Box<ThriftType>),
    Map(Box<ThriftType>, Box<ThriftType>),
}

/// Kind of a struct-like type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
    Struct,
    Union,
    Exception,
}

/// Field of a struct-like type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field ID
    pub id: i16,
    /// Field name
    pub name: String,
    /// Field type
    pub ty: ThriftType,
    /// Declared `required`
    pub required: bool,
}

/// A struct, union or exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    /// `program.Name`
    pub qualified_name: String,
    /// `Name`
    pub name: String,
    /// Struct kind
    pub kind: StructKind,
    /// Fields in declaration order
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    /// Field by ID.
    pub fn field(&self, id: i16) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.id == id)
    }
}

/// Struct-like types visible to one schema, keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    structs: HashMap<String, StructDef>,
    other_names: HashSet<String>,
}

impl TypeTable {
    /// Struct-like type by qualified name.
    pub fn get(&self, qualified_name: &str) -> Option<&StructDef> {
        self.structs.get(qualified_name)
    }

    /// Struct-like type by qualified name, failing with `InvalidInput`.
    pub fn require(&self, qualified_name: &str) -> Result<&StructDef> {
        self.get(qualified_name).ok_or_else(|| {
            RegistryError::invalid_input("thrift", format!("unresolved type {qualified_name}"))
        })
    }

    /// Number of struct-like types.
    pub fn len(&self) -> usize {
        self.structs.len()
    }

    /// Whether the table holds no struct-like type.
    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    fn add_program(&mut self, doc: ProgramDoc) {
        let program = doc.name;
        for named in doc.enums.iter().chain(&doc.typedefs).chain(&doc.services) {
            self.other_names.insert(format!("{program}.{}", named.name));
        }

        for def in doc.structs.into_iter().chain(doc.exceptions) {
            let qualified_name = format!("{program}.{}", def.name);
            if self.structs.contains_key(&qualified_name) {
                continue;
            }
            match convert_struct(&program, def) {
                Ok(converted) => {
                    self.structs.insert(qualified_name, converted);
                }
                Err(reason) => {
                    tracing::warn!(
                        type_name = %qualified_name,
                        reason = %reason,
                        "skipping unusable thrift type"
                    );
                }
            }
        }
    }

    /// Check that `qualified_name` and every struct it reaches are defined.
    fn check_closure(&self, qualified_name: &str) -> std::result::Result<(), String> {
        let mut pending = vec![qualified_name.to_string()];
        let mut seen = HashSet::new();

        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let def = self
                .structs
                .get(&name)
                .ok_or_else(|| format!("type {name} is not on the search path"))?;
            for field in &def.fields {
                collect_struct_refs(&field.ty, &mut pending);
            }
        }
        Ok(())
    }
}

fn collect_struct_refs(ty: &ThriftType, out: &mut Vec<String>) {
    match ty {
        ThriftType::Struct(name) => out.push(name.clone()),
        ThriftType::List(elem) | ThriftType::Set(elem) => collect_struct_refs(elem, out),
        ThriftType::Map(key, value) => {
            collect_struct_refs(key, out);
            collect_struct_refs(value, out);
        }
        _ => {}
    }
}

fn convert_struct(program: &str, doc: StructDoc) -> std::result::Result<StructDef, String> {
    let kind = if doc.is_exception {
        StructKind::Exception
    } else if doc.is_union {
        StructKind::Union
    } else {
        StructKind::Struct
    };

    let mut fields = Vec::with_capacity(doc.fields.len());
    for field in doc.fields {
        let ty = convert_type(program, &field.type_id, field.spec.as_ref())
            .map_err(|e| format!("field {}: {e}", field.name))?;
        fields.push(FieldDef {
            id: field.key,
            name: field.name,
            ty,
            required: field.required.as_deref() == Some("required"),
        });
    }

    Ok(StructDef {
        qualified_name: format!("{program}.{}", doc.name),
        name: doc.name,
        kind,
        fields,
    })
}

fn convert_ref(
    program: &str,
    type_id: Option<&str>,
    spec: Option<&TypeRefDoc>,
) -> std::result::Result<ThriftType, String> {
    match spec {
        Some(TypeRefDoc::Spec(spec)) => convert_spec(program, spec),
        Some(TypeRefDoc::Id(id)) => convert_type(program, id, None),
        None => {
            let id = type_id.ok_or_else(|| "missing nested type".to_string())?;
            convert_type(program, id, None)
        }
    }
}

fn convert_spec(program: &str, spec: &TypeSpecDoc) -> std::result::Result<ThriftType, String> {
    match spec.type_id.as_str() {
        "struct" | "union" | "exception" => {
            let class = spec
                .class
                .as_deref()
                .ok_or_else(|| format!("{} without class", spec.type_id))?;
            Ok(ThriftType::Struct(qualify(program, class)))
        }
        "list" => Ok(ThriftType::List(Box::new(convert_ref(
            program,
            spec.elem_type_id.as_deref(),
            spec.elem_type.as_ref(),
        )?))),
        "set" => Ok(ThriftType::Set(Box::new(convert_ref(
            program,
            spec.elem_type_id.as_deref(),
            spec.elem_type.as_ref(),
        )?))),
        "map" => Ok(ThriftType::Map(
            Box::new(convert_ref(
                program,
                spec.key_type_id.as_deref(),
                spec.key_type.as_ref(),
            )?),
            Box::new(convert_ref(
                program,
                spec.value_type_id.as_deref(),
                spec.value_type.as_ref(),
            )?),
        )),
        other => base_type(other),
    }
}

fn convert_type(
    program: &str,
    type_id: &str,
    spec: Option<&TypeRefDoc>,
) -> std::result::Result<ThriftType, String> {
    match spec {
        Some(TypeRefDoc::Spec(spec)) => convert_spec(program, spec),
        _ => base_type(type_id),
    }
}

fn base_type(type_id: &str) -> std::result::Result<ThriftType, String> {
    match type_id {
        "bool" => Ok(ThriftType::Bool),
        "byte" | "i8" => Ok(ThriftType::Byte),
        "i16" => Ok(ThriftType::I16),
        "i32" | "enum" => Ok(ThriftType::I32),
        "i64" => Ok(ThriftType::I64),
        "double" => Ok(ThriftType::Double),
        "string" => Ok(ThriftType::String),
        "binary" => Ok(ThriftType::Binary),
        other => Err(format!("unsupported type id '{other}'")),
    }
}

fn qualify(program: &str, class: &str) -> String {
    if class.contains('.') {
        class.to_string()
    } else {
        format!("{program}.{class}")
    }
}

// ============================================================================
// Artifact
// ============================================================================

/// Loaded Thrift schema: an isolated type table and its message types.
#[derive(Debug, Clone)]
pub struct ThriftArtifact {
    types: TypeTable,
    messages: BTreeMap<String, String>,
    index: MessageIndex,
}

impl ThriftArtifact {
    /// Load the schema owning `search_path`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::LoadFailure` if the manifest is missing or no
    /// manifest entry resolves to a usable struct-like type.
    pub fn load(search_path: &SearchPath) -> Result<Self> {
        let schema_id = search_path.schema_id();
        let mut types = TypeTable::default();
        let mut programs = HashSet::new();

        for path in search_path.find_files(PROGRAM_EXTENSIONS)? {
            let text = fs::read_to_string(&path).map_err(|e| {
                RegistryError::load_failure(schema_id, format!("cannot read {}: {e}", path.display()))
            })?;
            let doc: ProgramDoc = match serde_json::from_str(&text) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(
                        schema = %schema_id,
                        path = %path.display(),
                        error = %e,
                        "skipping file that is not a thrift program description"
                    );
                    continue;
                }
            };
            if programs.insert(doc.name.clone()) {
                tracing::debug!(
                    schema = %schema_id,
                    program = %doc.name,
                    path = %path.display(),
                    "found thrift program"
                );
                types.add_program(doc);
            }
        }

        let mut classified = Vec::new();
        let mut messages = BTreeMap::new();
        for artifact in search_path.read_manifest()? {
            let Some(def) = types.get(&artifact) else {
                if types.other_names.contains(&artifact) {
                    tracing::warn!(
                        schema = %schema_id,
                        artifact = %artifact,
                        "thrift artifact is not a struct, union or exception"
                    );
                } else {
                    tracing::warn!(
                        schema = %schema_id,
                        artifact = %artifact,
                        "thrift artifact not found on search path"
                    );
                }
                continue;
            };

            if let Err(reason) = types.check_closure(&artifact) {
                tracing::warn!(
                    schema = %schema_id,
                    artifact = %artifact,
                    reason = %reason,
                    "cannot resolve thrift artifact"
                );
                continue;
            }

            if messages.contains_key(&def.name) {
                continue;
            }
            let class = if def.kind == StructKind::Exception {
                ArtifactClass::ErrorMessage
            } else {
                ArtifactClass::Message
            };
            classified.push(ClassifiedArtifact::new(def.name.clone(), class));
            messages.insert(def.name.clone(), def.qualified_name.clone());
        }

        if messages.is_empty() {
            return Err(RegistryError::load_failure(
                schema_id,
                "no thrift message definitions found",
            ));
        }

        let default = infer_multi_class_default(&classified);
        let index = MessageIndex::new(messages.keys().cloned(), default);
        tracing::debug!(
            schema = %schema_id,
            messages = index.known().len(),
            default = index.default().unwrap_or_default(),
            "loaded thrift schema"
        );

        Ok(Self {
            types,
            messages,
            index,
        })
    }

    /// Struct descriptor by simple message name.
    pub fn message(&self, name: &str) -> Option<&StructDef> {
        self.messages
            .get(name)
            .and_then(|qualified| self.types.get(qualified))
    }

    /// Every struct-like type visible to the schema.
    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Known messages and default.
    pub fn index(&self) -> &MessageIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = r#"{
        "name": "tutorial",
        "enums": [{"name": "Operation", "members": [{"name": "ADD", "value": 1}]}],
        "typedefs": [{"name": "MyInteger", "typeId": "i32"}],
        "structs": [
            {
                "name": "Work",
                "isException": false,
                "isUnion": false,
                "fields": [
                    {"key": 1, "name": "num1", "typeId": "i32", "required": "req_out"},
                    {"key": 3, "name": "op", "typeId": "i32",
                     "type": {"typeId": "i32", "class": "tutorial.Operation"}},
                    {"key": 4, "name": "tags", "typeId": "list",
                     "type": {"typeId": "list", "elemTypeId": "string"}},
                    {"key": 5, "name": "attrs", "typeId": "map",
                     "type": {"typeId": "map", "keyTypeId": "string", "valueTypeId": "struct",
                              "valueType": {"typeId": "struct", "class": "Note"}}}
                ]
            },
            {"name": "Note", "fields": [{"key": 1, "name": "text", "typeId": "string", "required": "required"}]},
            {"name": "Broken", "fields": [{"key": 1, "name": "x", "typeId": "struct",
                                          "type": {"typeId": "struct", "class": "other.Missing"}}]}
        ],
        "exceptions": [
            {"name": "InvalidOperation", "isException": true,
             "fields": [{"key": 1, "name": "why", "typeId": "string"}]}
        ],
        "services": [{"name": "Calculator"}]
    }"#;

    fn table() -> TypeTable {
        let mut table = TypeTable::default();
        table.add_program(serde_json::from_str(PROGRAM).unwrap());
        table
    }

    #[test]
    fn test_program_conversion() {
        let table = table();
        assert_eq!(table.len(), 4);

        let work = table.get("tutorial.Work").unwrap();
        assert_eq!(work.kind, StructKind::Struct);
        assert_eq!(work.fields.len(), 4);
        assert_eq!(work.field(3).unwrap().ty, ThriftType::I32);
        assert_eq!(
            work.field(4).unwrap().ty,
            ThriftType::List(Box::new(ThriftType::String))
        );
        assert_eq!(
            work.field(5).unwrap().ty,
            ThriftType::Map(
                Box::new(ThriftType::String),
                Box::new(ThriftType::Struct("tutorial.Note".into()))
            )
        );
        assert!(table.get("tutorial.Note").unwrap().fields[0].required);
        assert_eq!(
            table.get("tutorial.InvalidOperation").unwrap().kind,
            StructKind::Exception
        );
    }

    #[test]
    fn test_non_struct_names_are_tracked() {
        let table = table();
        assert!(table.other_names.contains("tutorial.Operation"));
        assert!(table.other_names.contains("tutorial.Calculator"));
        assert!(table.get("tutorial.Operation").is_none());
    }

    #[test]
    fn test_closure_check() {
        let table = table();
        assert!(table.check_closure("tutorial.Work").is_ok());
        let err = table.check_closure("tutorial.Broken").unwrap_err();
        assert!(err.contains("other.Missing"));
    }

    #[test]
    fn test_unsupported_type_id_is_rejected() {
        assert!(base_type("void").is_err());
        assert_eq!(base_type("i8").unwrap(), ThriftType::Byte);
        assert_eq!(base_type("byte").unwrap(), ThriftType::Byte);
    }
}
