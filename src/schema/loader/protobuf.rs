// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf artifact loading.
//!
//! Generated artifacts are serialized `FileDescriptorSet`s (`*.desc` or
//! `*.pb`, as written by `protoc --descriptor_set_out`). Every set on the
//! schema's search path is merged into one private [`DescriptorPool`], so an
//! import can only be satisfied by the schema itself or its declared
//! dependencies. A file whose imports cannot be satisfied is left out of the
//! pool along with every file importing it; the rest of the schema loads.
//! Manifest lines name proto files (e.g. `addressbook.proto`) or
//! fully-qualified message names.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;

use prost::Message;
use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::{FileDescriptorProto, FileDescriptorSet};

use super::{infer_single_class_default, MessageIndex, SearchPath};
use crate::core::{RegistryError, Result};

/// Descriptor set file extensions.
pub const DESCRIPTOR_EXTENSIONS: &[&str] = &["desc", "pb"];

/// Loaded Protobuf schema: an isolated descriptor pool and its messages.
#[derive(Debug, Clone)]
pub struct ProtobufArtifact {
    messages: BTreeMap<String, MessageDescriptor>,
    index: MessageIndex,
}

impl ProtobufArtifact {
    /// Load the schema owning `search_path`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::LoadFailure` if a descriptor set is corrupt
    /// or no manifest entry yields a message.
    pub fn load(search_path: &SearchPath) -> Result<Self> {
        let schema_id = search_path.schema_id();
        let files = collect_file_protos(search_path)?;
        let files = order_by_imports(files);

        // one file at a time: a failed add leaves the pool unchanged
        let mut pool = DescriptorPool::new();
        for file in files {
            let name = file.name().to_string();
            if let Err(e) = pool.add_file_descriptor_proto(file) {
                tracing::warn!(
                    schema = %schema_id,
                    file = %name,
                    error = %e,
                    "skipping protobuf file"
                );
            }
        }

        let mut messages = BTreeMap::new();
        let mut top_level = Vec::new();
        for artifact in search_path.read_manifest()? {
            let roots: Vec<MessageDescriptor> = if let Some(file) = pool.get_file_by_name(&artifact)
            {
                file.messages().filter(|m| !m.is_map_entry()).collect()
            } else if let Some(message) = pool.get_message_by_name(&artifact) {
                vec![message]
            } else {
                tracing::warn!(
                    schema = %schema_id,
                    artifact = %artifact,
                    "protobuf artifact not found on search path"
                );
                continue;
            };

            for message in roots {
                top_level.push(message.name().to_string());
                register_message(schema_id, &mut messages, message);
            }
        }

        if messages.is_empty() {
            return Err(RegistryError::load_failure(
                schema_id,
                "no protobuf message definitions found",
            ));
        }

        let default = infer_single_class_default(&top_level);
        let index = MessageIndex::new(messages.keys().cloned(), default);
        tracing::debug!(
            schema = %schema_id,
            messages = index.known().len(),
            default = index.default().unwrap_or_default(),
            "loaded protobuf schema"
        );

        Ok(Self { messages, index })
    }

    /// Message descriptor by simple name.
    pub fn message(&self, name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(name)
    }

    /// Known messages and default.
    pub fn index(&self) -> &MessageIndex {
        &self.index
    }
}

/// Add `message` and, recursively, its nested messages under their simple
/// names. The first definition of a simple name wins.
fn register_message(
    schema_id: &str,
    messages: &mut BTreeMap<String, MessageDescriptor>,
    message: MessageDescriptor,
) {
    for child in message.child_messages() {
        if !child.is_map_entry() {
            register_message(schema_id, messages, child);
        }
    }

    let name = message.name().to_string();
    if let Some(existing) = messages.get(&name) {
        tracing::debug!(
            schema = %schema_id,
            name = %name,
            kept = %existing.full_name(),
            skipped = %message.full_name(),
            "duplicate simple message name"
        );
        return;
    }
    messages.insert(name, message);
}

/// Decode every descriptor set on the search path, keeping the first
/// definition of each proto file name.
fn collect_file_protos(search_path: &SearchPath) -> Result<Vec<FileDescriptorProto>> {
    let schema_id = search_path.schema_id();
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for path in search_path.find_files(DESCRIPTOR_EXTENSIONS)? {
        let bytes = fs::read(&path).map_err(|e| {
            RegistryError::load_failure(schema_id, format!("cannot read {}: {e}", path.display()))
        })?;
        let set = FileDescriptorSet::decode(bytes.as_slice()).map_err(|e| {
            RegistryError::load_failure(
                schema_id,
                format!("invalid descriptor set {}: {e}", path.display()),
            )
        })?;

        tracing::debug!(
            schema = %schema_id,
            path = %path.display(),
            files = set.file.len(),
            "found descriptor set"
        );

        for file in set.file {
            if seen.insert(file.name().to_string()) {
                files.push(file);
            }
        }
    }

    Ok(files)
}

/// Order files so every import precedes the files importing it. Imports not
/// present in `files` are left for the pool to report.
fn order_by_imports(files: Vec<FileDescriptorProto>) -> Vec<FileDescriptorProto> {
    let mut by_name: HashMap<String, FileDescriptorProto> = HashMap::new();
    let mut names = Vec::with_capacity(files.len());
    for file in files {
        names.push(file.name().to_string());
        by_name.insert(file.name().to_string(), file);
    }

    fn visit(
        name: &str,
        by_name: &mut HashMap<String, FileDescriptorProto>,
        ordered: &mut Vec<FileDescriptorProto>,
    ) {
        let Some(file) = by_name.remove(name) else {
            return;
        };
        for import in &file.dependency {
            visit(import, by_name, ordered);
        }
        ordered.push(file);
    }

    let mut ordered = Vec::with_capacity(names.len());
    for name in &names {
        visit(name, &mut by_name, &mut ordered);
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, deps: &[&str]) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            dependency: deps.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_order_by_imports() {
        let ordered = order_by_imports(vec![
            file("app.proto", &["net.proto", "base.proto"]),
            file("net.proto", &["base.proto"]),
            file("base.proto", &[]),
        ]);
        let names: Vec<&str> = ordered.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["base.proto", "net.proto", "app.proto"]);
    }

    #[test]
    fn test_order_by_imports_keeps_missing_imports_for_the_pool() {
        let ordered = order_by_imports(vec![file("app.proto", &["missing.proto"])]);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].dependency, vec!["missing.proto".to_string()]);
    }
}
