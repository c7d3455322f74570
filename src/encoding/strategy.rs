// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Uniform conversion interface over the supported schema systems.
//!
//! ## Architecture
//!
//! - **Strategy trait** ([`FormatStrategy`]) - text ⇄ binary conversion for
//!   one schema system, over every schema of that system in a generation
//! - **Load context** ([`LoadContext`]) - catalog, dependency closures and
//!   the failure log shared by all strategies while a generation is built
//!
//! A strategy owns the loaded artifacts of its schemas. Artifacts are never
//! mutated after loading, so a strategy can serve any number of concurrent
//! requests.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::core::{Parameters, RegistryError, Result, SchemaFormat};
use crate::schema::{Catalog, MessageIndex, SchemaEntry, SearchPath};

/// Text ⇄ binary conversion for one schema system.
pub trait FormatStrategy: Send + Sync {
    /// Schema system handled by this strategy.
    fn format(&self) -> SchemaFormat;

    /// Convert the text form read from `input` into the binary form written
    /// to `output`.
    ///
    /// # Arguments
    ///
    /// * `schema_id` - Catalog ID of the schema
    /// * `message` - Message name; `None` or empty selects the default
    /// * `input` - Text source
    /// * `output` - Binary sink
    /// * `params` - Format options
    fn serialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()>;

    /// Convert the binary form read from `input` into the text form written
    /// to `output`.
    fn deserialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()>;

    /// Known messages and default for a loaded schema.
    fn message_index(&self, schema_id: &str) -> Option<&MessageIndex>;

    /// IDs of every schema this strategy loaded successfully.
    fn loaded_schemas(&self) -> Vec<&str>;
}

/// Shared state while the strategies of one generation load their schemas.
#[derive(Debug)]
pub struct LoadContext<'a> {
    catalog: &'a Catalog,
    closures: &'a BTreeMap<String, Vec<String>>,
    failures: Vec<RegistryError>,
}

impl<'a> LoadContext<'a> {
    /// Create a context over `catalog` and its precomputed closures.
    pub fn new(catalog: &'a Catalog, closures: &'a BTreeMap<String, Vec<String>>) -> Self {
        Self {
            catalog,
            closures,
            failures: Vec::new(),
        }
    }

    /// Catalog being loaded.
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Dependency closure of `schema_id`.
    pub fn closure(&self, schema_id: &str) -> &'a [String] {
        self.closures
            .get(schema_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Isolated search path for a schema. Dependencies missing from the
    /// catalog fail code-loaded formats only.
    pub fn search_path(&self, schema_id: &str) -> Result<SearchPath> {
        let strict = self
            .catalog
            .get(schema_id)
            .and_then(|entry| entry.format())
            .is_some_and(|format| format.is_code_loaded());
        SearchPath::for_schema(self.catalog, schema_id, self.closure(schema_id), strict)
    }

    /// Load every catalog entry of `format`, keeping the successes.
    ///
    /// A failing schema is logged and recorded; it never prevents the other
    /// schemas from loading.
    pub fn load_each<A, F>(&mut self, format: SchemaFormat, mut load: F) -> BTreeMap<String, A>
    where
        F: FnMut(&Self, &SchemaEntry) -> Result<A>,
    {
        let catalog = self.catalog;
        let mut loaded = BTreeMap::new();

        for entry in catalog.entries_of(format) {
            match load(self, entry) {
                Ok(artifact) => {
                    loaded.insert(entry.id.clone(), artifact);
                }
                Err(err) => {
                    let err = match err {
                        RegistryError::LoadFailure { .. } => err,
                        other => RegistryError::load_failure(&entry.id, other.to_string()),
                    };
                    tracing::warn!(
                        schema = %entry.id,
                        format = %format,
                        error = %err,
                        "schema not loaded"
                    );
                    self.failures.push(err);
                }
            }
        }

        tracing::debug!(
            format = %format,
            loaded = loaded.len(),
            "format strategy loaded"
        );
        loaded
    }

    /// Load failures recorded so far.
    pub fn failures(&self) -> &[RegistryError] {
        &self.failures
    }

    /// Consume the context, returning the recorded load failures.
    pub fn into_failures(self) -> Vec<RegistryError> {
        self.failures
    }
}

/// Look up a loaded artifact, failing with `UnknownSchema`.
pub(crate) fn artifact<'a, A>(
    artifacts: &'a BTreeMap<String, A>,
    schema_id: &str,
) -> Result<&'a A> {
    artifacts
        .get(schema_id)
        .ok_or_else(|| RegistryError::unknown_schema(schema_id))
}

/// Map a JSON error, keeping source and sink failures as I/O errors.
pub(crate) fn json_error(context: &str, err: serde_json::Error) -> RegistryError {
    if err.is_io() {
        RegistryError::from(std::io::Error::from(err))
    } else {
        RegistryError::invalid_input(context, err.to_string())
    }
}
