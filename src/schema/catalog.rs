// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema catalog.
//!
//! The catalog is a JSON document mapping schema IDs to entries:
//!
//! ```json
//! {
//!   "addr-book": {
//!     "url": "https://schemas.example.com/addr-book",
//!     "filename": "addressbook.proto",
//!     "type": "protobuf",
//!     "sha1sum": "3f786850e387550fdab836ed7e6dc881de23001b",
//!     "depends": ["common"],
//!     "description": "Address book records",
//!     "custodian": "platform-team"
//!   }
//! }
//! ```
//!
//! `filename` and `type` are required; `depends`, `description` and
//! `custodian` default to empty; unknown fields are ignored. Each schema owns
//! the directory `<root>/<id>/` holding its source file, its `MANIFEST` and
//! any generated artifacts.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{RegistryError, Result, SchemaFormat};
use crate::schema::loader::MessageIndex;

/// Suffix of the pristine copy of a schema source file.
const ORIGINAL_SUFFIX: &str = ".orig";

/// Catalog entry as it appears on disk.
#[derive(Debug, Deserialize)]
struct CatalogRecord {
    #[serde(default)]
    url: Option<String>,
    filename: String,
    #[serde(rename = "type")]
    format: String,
    #[serde(default)]
    sha1sum: Option<String>,
    #[serde(default)]
    depends: Option<Vec<String>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    custodian: Option<String>,
}

/// Metadata for one schema.
///
/// `messages` and `default_message` are derived during the load pass of the
/// generation that owns the entry and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaEntry {
    /// Schema ID (the catalog key)
    #[serde(skip)]
    pub id: String,
    /// Informational URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Source file name, relative to the schema directory
    pub filename: String,
    /// Raw format tag from the catalog
    #[serde(rename = "type")]
    pub format_tag: String,
    /// Informational checksum of the source file
    #[serde(rename = "sha1sum", skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// IDs of schemas this one depends on
    #[serde(rename = "depends")]
    pub dependencies: Vec<String>,
    /// Free-form description
    pub description: String,
    /// Owning party
    #[serde(rename = "custodian")]
    pub owner: String,
    /// Message names the loaded schema defines
    pub messages: BTreeSet<String>,
    /// Message used when a request names none; empty when not inferable
    #[serde(rename = "defaultMessage")]
    pub default_message: String,
}

impl SchemaEntry {
    fn from_record(id: String, record: CatalogRecord) -> Self {
        Self {
            id,
            url: record.url,
            filename: record.filename,
            format_tag: record.format,
            checksum: record.sha1sum,
            dependencies: record.depends.unwrap_or_default(),
            description: record.description.unwrap_or_default(),
            owner: record.custodian.unwrap_or_default(),
            messages: BTreeSet::new(),
            default_message: String::new(),
        }
    }

    /// Parsed format, or `None` for a tag no built-in strategy handles.
    pub fn format(&self) -> Option<SchemaFormat> {
        self.format_tag.parse().ok()
    }

    /// Default message name, if one was inferred.
    pub fn default_message(&self) -> Option<&str> {
        if self.default_message.is_empty() {
            None
        } else {
            Some(&self.default_message)
        }
    }
}

/// Parsed catalog for one generation.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: BTreeMap<String, SchemaEntry>,
    root_directory: PathBuf,
    generation: u64,
}

impl Catalog {
    /// Parse a catalog document.
    ///
    /// # Arguments
    ///
    /// * `source` - Where the document came from, used in error messages
    /// * `document` - Raw JSON bytes
    /// * `root_directory` - Directory holding one subdirectory per schema
    /// * `generation` - Generation number this catalog belongs to
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::CatalogBuild` if the document is malformed or
    /// an entry lacks `type` or `filename`.
    pub fn parse(
        source: &str,
        document: &[u8],
        root_directory: impl Into<PathBuf>,
        generation: u64,
    ) -> Result<Self> {
        let records: BTreeMap<String, CatalogRecord> = serde_json::from_slice(document)
            .map_err(|e| RegistryError::catalog_build(source, e.to_string()))?;

        let mut entries = BTreeMap::new();
        for (id, record) in records {
            let entry = SchemaEntry::from_record(id.clone(), record);
            if entry.format().is_none() {
                tracing::warn!(
                    schema = %id,
                    format = %entry.format_tag,
                    "catalog entry has an unsupported schema type"
                );
            }
            entries.insert(id, entry);
        }

        Ok(Self {
            entries,
            root_directory: root_directory.into(),
            generation,
        })
    }

    /// Read and parse a catalog file.
    pub fn load(
        path: &Path,
        root_directory: impl Into<PathBuf>,
        generation: u64,
    ) -> Result<Self> {
        let source = path.display().to_string();
        let document =
            fs::read(path).map_err(|e| RegistryError::catalog_build(&source, e.to_string()))?;
        Self::parse(&source, &document, root_directory, generation)
    }

    /// Look up an entry by ID.
    pub fn get(&self, id: &str) -> Option<&SchemaEntry> {
        self.entries.get(id)
    }

    /// Look up an entry by ID, failing with `UnknownSchema`.
    pub fn entry(&self, id: &str) -> Result<&SchemaEntry> {
        self.get(id).ok_or_else(|| RegistryError::unknown_schema(id))
    }

    /// Check whether an ID is present.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All entries in ID order.
    pub fn entries(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.values()
    }

    /// Entries whose catalog tag parses to `format`.
    pub fn entries_of(&self, format: SchemaFormat) -> impl Iterator<Item = &SchemaEntry> {
        self.entries
            .values()
            .filter(move |entry| entry.format() == Some(format))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Directory anchoring every schema directory.
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Generation number this catalog belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Directory owned by schema `id`.
    pub fn schema_dir(&self, id: &str) -> PathBuf {
        self.root_directory.join(id)
    }

    /// Path of the schema's source file, preferring the `.orig` copy when
    /// one exists next to it.
    pub fn source_path(&self, id: &str) -> Result<PathBuf> {
        let entry = self.entry(id)?;
        let dir = self.schema_dir(id);
        let original = dir.join(format!("{}{ORIGINAL_SUFFIX}", entry.filename));
        if original.is_file() {
            Ok(original)
        } else {
            Ok(dir.join(&entry.filename))
        }
    }

    /// Read the raw schema source (see [`source_path`](Self::source_path)).
    pub fn read_source(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.source_path(id)?;
        Ok(fs::read(path)?)
    }

    /// Record the messages discovered for `id` by the load pass.
    pub(crate) fn record_messages(&mut self, id: &str, index: &MessageIndex) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.messages = index.known().clone();
            entry.default_message = index.default().unwrap_or_default().to_string();
        }
    }

    /// Serialize every entry, keyed by ID, including derived message info.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.entries)
            .map_err(|e| RegistryError::invalid_input("catalog", e.to_string()))
    }

    /// Serialize one entry, including derived message info.
    pub fn entry_json_pretty(&self, id: &str) -> Result<String> {
        let entry = self.entry(id)?;
        serde_json::to_string_pretty(entry)
            .map_err(|e| RegistryError::invalid_input("catalog", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "addr-book": {
            "url": "https://schemas.example.com/addr-book",
            "filename": "addressbook.proto",
            "type": "protobuf",
            "sha1sum": "abc",
            "depends": ["common"],
            "description": "Address book",
            "custodian": "platform",
            "retention": "forever"
        },
        "common": {
            "filename": "common.proto",
            "type": "protobuf"
        },
        "legacy": {
            "filename": "legacy.xsd",
            "type": "xml"
        }
    }"#;

    fn catalog() -> Catalog {
        Catalog::parse("inline", CATALOG.as_bytes(), "/srv/schemas", 3).unwrap()
    }

    #[test]
    fn test_parse_catalog() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.generation(), 3);
        assert_eq!(
            catalog.entries().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["addr-book", "common", "legacy"]
        );

        let entry = catalog.get("addr-book").unwrap();
        assert_eq!(entry.id, "addr-book");
        assert_eq!(entry.format(), Some(SchemaFormat::Protobuf));
        assert_eq!(entry.dependencies, vec!["common".to_string()]);
        assert_eq!(entry.owner, "platform");
        assert_eq!(entry.checksum.as_deref(), Some("abc"));
        assert!(entry.messages.is_empty());
        assert_eq!(entry.default_message(), None);
    }

    #[test]
    fn test_optional_fields_default_to_empty() {
        let catalog = catalog();
        let entry = catalog.get("common").unwrap();
        assert!(entry.dependencies.is_empty());
        assert!(entry.description.is_empty());
        assert!(entry.owner.is_empty());
        assert!(entry.url.is_none());
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let catalog = catalog();
        let entry = catalog.get("legacy").unwrap();
        assert_eq!(entry.format(), None);
        assert_eq!(entry.format_tag, "xml");
        assert_eq!(catalog.entries_of(SchemaFormat::Protobuf).count(), 2);
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let err = Catalog::parse("inline", br#"{"a": {"type": "avro"}}"#, "/tmp", 1).unwrap_err();
        assert!(matches!(err, RegistryError::CatalogBuild { .. }));
        assert!(err.to_string().contains("filename"));

        let err = Catalog::parse("inline", br#"{"a": {"filename": "a.avsc"}}"#, "/tmp", 1)
            .unwrap_err();
        assert!(err.to_string().contains("type"));
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        let err = Catalog::parse("inline", b"[1, 2", "/tmp", 1).unwrap_err();
        assert!(matches!(err, RegistryError::CatalogBuild { .. }));
    }

    #[test]
    fn test_schema_dir_and_unknown_entry() {
        let catalog = catalog();
        assert_eq!(
            catalog.schema_dir("common"),
            PathBuf::from("/srv/schemas/common")
        );
        assert!(catalog.entry("nope").unwrap_err().is_not_found());
        assert!(catalog.source_path("nope").is_err());
    }

    #[test]
    fn test_record_messages_and_json_view() {
        let mut catalog = catalog();
        let index = MessageIndex::new(["Person", "AddressBook"], Some("AddressBook".into()));
        catalog.record_messages("addr-book", &index);

        let entry = catalog.get("addr-book").unwrap();
        assert_eq!(entry.default_message(), Some("AddressBook"));

        let json: serde_json::Value =
            serde_json::from_str(&catalog.entry_json_pretty("addr-book").unwrap()).unwrap();
        assert_eq!(json["type"], "protobuf");
        assert_eq!(json["custodian"], "platform");
        assert_eq!(json["defaultMessage"], "AddressBook");
        assert_eq!(json["messages"], serde_json::json!(["AddressBook", "Person"]));
        assert!(json.get("retention").is_none());
    }
}
