// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.
//!
//! [`SchemaTree`] lays out a catalog and schema root in a temporary
//! directory that is removed when the tree is dropped. The fixture writers
//! below produce the generated artifacts each format loads: Avro schema
//! documents, Protobuf descriptor sets (built in-process with `prost-types`)
//! and Thrift IDL JSON descriptions.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};
use serde_json::{json, Value};

// ============================================================================
// Temporary directories
// ============================================================================

fn temp_dir(name: &str) -> PathBuf {
    let random = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let thread_id = format!("{:?}", std::thread::current().id())
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>();
    std::env::temp_dir().join(format!(
        "schemacodec_{}_{}_{}_{}",
        name,
        std::process::id(),
        thread_id,
        random
    ))
}

/// Removes the directory when dropped.
pub struct CleanupGuard(PathBuf);

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

// ============================================================================
// Schema tree
// ============================================================================

/// A catalog file plus a schema root directory.
pub struct SchemaTree {
    base: PathBuf,
    _guard: CleanupGuard,
}

impl SchemaTree {
    pub fn new(name: &str) -> Self {
        let base = temp_dir(name);
        fs::create_dir_all(base.join("schemas")).unwrap();
        Self {
            _guard: CleanupGuard(base.clone()),
            base,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.base.join("catalog.json")
    }

    pub fn root(&self) -> PathBuf {
        self.base.join("schemas")
    }

    pub fn write_catalog(&self, catalog: &Value) {
        fs::write(
            self.catalog_path(),
            serde_json::to_vec_pretty(catalog).unwrap(),
        )
        .unwrap();
    }

    pub fn write_file(&self, schema_id: &str, name: &str, contents: impl AsRef<[u8]>) {
        let dir = self.root().join(schema_id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), contents).unwrap();
    }

    pub fn write_manifest(&self, schema_id: &str, lines: &[&str]) {
        let mut text = String::from("# generated artifacts\n");
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        self.write_file(schema_id, "MANIFEST", text);
    }
}

/// One catalog entry.
pub fn entry(filename: &str, format: &str, depends: &[&str]) -> Value {
    json!({
        "url": format!("https://schemas.example.org/{filename}"),
        "filename": filename,
        "type": format,
        "sha1sum": "0000000000000000000000000000000000000000",
        "depends": depends,
        "description": format!("{format} test schema"),
        "custodian": "schema-team@example.org"
    })
}

// ============================================================================
// Avro fixtures
// ============================================================================

pub const USER_AVSC: &str = r#"{
    "type": "record",
    "name": "User",
    "namespace": "example.avro",
    "fields": [
        {"name": "name", "type": "string"},
        {"name": "age", "type": "int"},
        {"name": "email", "type": ["null", "string"], "default": null}
    ]
}"#;

pub const ADDRESS_AVSC: &str = r#"{
    "type": "record",
    "name": "Address",
    "namespace": "example.common",
    "fields": [
        {"name": "city", "type": "string"},
        {"name": "zip", "type": "string"}
    ]
}"#;

pub const CUSTOMER_AVSC: &str = r#"{
    "type": "record",
    "name": "Customer",
    "namespace": "example.crm",
    "fields": [
        {"name": "id", "type": "long"},
        {"name": "address", "type": "example.common.Address"}
    ]
}"#;

// ============================================================================
// Protobuf fixtures
// ============================================================================

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str, repeated: bool) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(if repeated { Label::Repeated } else { Label::Optional } as i32),
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn file(
    name: &str,
    package: &str,
    dependency: &[&str],
    messages: Vec<DescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        dependency: dependency.iter().map(|d| d.to_string()).collect(),
        message_type: messages,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// Serialize files as a descriptor set, as `protoc --descriptor_set_out`.
pub fn descriptor_set(files: Vec<FileDescriptorProto>) -> Vec<u8> {
    FileDescriptorSet { file: files }.encode_to_vec()
}

/// `addressbook.proto`: `tutorial.Person` (with nested `PhoneNumber`) and
/// `tutorial.AddressBook`.
pub fn addressbook_proto() -> FileDescriptorProto {
    let mut person = message(
        "Person",
        vec![
            field("name", 1, Type::String),
            field("id", 2, Type::Int32),
            field("email", 3, Type::String),
            message_field("phones", 4, ".tutorial.Person.PhoneNumber", true),
        ],
    );
    person.nested_type = vec![message(
        "PhoneNumber",
        vec![field("number", 1, Type::String)],
    )];

    let book = message(
        "AddressBook",
        vec![message_field("people", 1, ".tutorial.Person", true)],
    );

    file("addressbook.proto", "tutorial", &[], vec![person, book])
}

/// `common/time.proto`: `common.Timestamp`.
pub fn time_proto() -> FileDescriptorProto {
    file(
        "common/time.proto",
        "common",
        &[],
        vec![message(
            "Timestamp",
            vec![field("seconds", 1, Type::Int64), field("nanos", 2, Type::Int32)],
        )],
    )
}

/// `events.proto`: `events.Event`, importing `common/time.proto`.
pub fn events_proto() -> FileDescriptorProto {
    file(
        "events.proto",
        "events",
        &["common/time.proto"],
        vec![message(
            "Event",
            vec![
                field("name", 1, Type::String),
                message_field("at", 2, ".common.Timestamp", false),
            ],
        )],
    )
}

// ============================================================================
// Thrift fixtures
// ============================================================================

/// `thrift --gen json` output for:
///
/// ```thrift
/// namespace * shapes
/// struct Point { 1: i32 x, 2: string label }
/// union Shape { 1: Point point, 2: list<Point> path }
/// exception InvalidShape { 1: required string reason }
/// ```
pub fn shapes_program() -> Value {
    json!({
        "name": "shapes",
        "namespaces": {"*": "shapes"},
        "includes": [],
        "enums": [],
        "typedefs": [],
        "structs": [
            {
                "name": "Point",
                "isException": false,
                "isUnion": false,
                "fields": [
                    {"key": 1, "name": "x", "typeId": "i32", "required": "req_out"},
                    {"key": 2, "name": "label", "typeId": "string", "required": "req_out"}
                ]
            },
            {
                "name": "Shape",
                "isException": false,
                "isUnion": true,
                "fields": [
                    {
                        "key": 1, "name": "point", "typeId": "struct",
                        "type": {"typeId": "struct", "class": "Point"},
                        "required": "optional"
                    },
                    {
                        "key": 2, "name": "path", "typeId": "list",
                        "type": {
                            "typeId": "list",
                            "elemTypeId": "struct",
                            "elemType": {"typeId": "struct", "class": "Point"}
                        },
                        "required": "optional"
                    }
                ]
            }
        ],
        "constants": [],
        "exceptions": [
            {
                "name": "InvalidShape",
                "isException": true,
                "isUnion": false,
                "fields": [
                    {"key": 1, "name": "reason", "typeId": "string", "required": "required"}
                ]
            }
        ],
        "services": []
    })
}

/// Program `drawing` referencing `shapes.Point` from a dependency.
pub fn drawing_program() -> Value {
    json!({
        "name": "drawing",
        "structs": [
            {
                "name": "Canvas",
                "isException": false,
                "isUnion": false,
                "fields": [
                    {"key": 1, "name": "title", "typeId": "string", "required": "required"},
                    {
                        "key": 2, "name": "origin", "typeId": "struct",
                        "type": {"typeId": "struct", "class": "shapes.Point"},
                        "required": "req_out"
                    },
                    {
                        "key": 3, "name": "labels", "typeId": "map",
                        "type": {"typeId": "map", "keyTypeId": "string", "valueTypeId": "i32"},
                        "required": "req_out"
                    }
                ]
            }
        ]
    })
}

/// Catalog and files for every format:
///
/// - `user` (avro), `address` and `customer` (avro, with a dependency)
/// - `addr-book` (protobuf, default `Person`)
/// - `time` and `events` (protobuf, with a dependency)
/// - `shapes` and `drawing` (thrift, with a dependency)
pub fn standard_tree(name: &str) -> SchemaTree {
    let tree = SchemaTree::new(name);

    tree.write_file("user", "user.avsc", USER_AVSC);
    tree.write_file("address", "address.avsc", ADDRESS_AVSC);
    tree.write_file("customer", "customer.avsc", CUSTOMER_AVSC);

    tree.write_file("addr-book", "addressbook.proto", "// source\n");
    tree.write_file("addr-book", "addressbook.desc", descriptor_set(vec![addressbook_proto()]));
    tree.write_manifest("addr-book", &["tutorial.Person"]);

    tree.write_file("time", "time.proto", "// source\n");
    tree.write_file("time", "time.desc", descriptor_set(vec![time_proto()]));
    tree.write_manifest("time", &["common/time.proto"]);

    tree.write_file("events", "events.proto", "// source\n");
    tree.write_file("events", "events.desc", descriptor_set(vec![events_proto()]));
    tree.write_manifest("events", &["events.proto"]);

    tree.write_file("shapes", "shapes.thrift", "// source\n");
    tree.write_file("shapes", "shapes.json", shapes_program().to_string());
    tree.write_manifest("shapes", &["shapes.Point", "shapes.Shape", "shapes.InvalidShape"]);

    tree.write_file("drawing", "drawing.thrift", "// source\n");
    tree.write_file("drawing", "drawing.json", drawing_program().to_string());
    tree.write_manifest("drawing", &["drawing.Canvas"]);

    tree.write_catalog(&json!({
        "user": entry("user.avsc", "avro", &[]),
        "address": entry("address.avsc", "avro", &[]),
        "customer": entry("customer.avsc", "avro", &["address"]),
        "addr-book": entry("addressbook.proto", "protobuf", &[]),
        "time": entry("time.proto", "protobuf", &[]),
        "events": entry("events.proto", "protobuf", &["time"]),
        "shapes": entry("shapes.thrift", "thrift", &[]),
        "drawing": entry("drawing.thrift", "thrift", &["shapes"])
    }));

    tree
}
