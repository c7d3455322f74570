// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Routing of requests to the strategy of the schema's format.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::core::{Parameters, RegistryError, Result, SchemaFormat};
use crate::encoding::FormatStrategy;
use crate::schema::{Catalog, MessageIndex};

/// Strategies of one generation keyed by format.
///
/// Built once per generation and immutable afterwards.
pub struct DispatchRegistry {
    catalog: Arc<Catalog>,
    strategies: HashMap<SchemaFormat, Box<dyn FormatStrategy>>,
}

impl DispatchRegistry {
    /// Create a registry with no strategies over `catalog`.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            strategies: HashMap::new(),
        }
    }

    /// Register a strategy under its own format, replacing any previous one.
    pub fn register(&mut self, strategy: Box<dyn FormatStrategy>) {
        self.strategies.insert(strategy.format(), strategy);
    }

    /// Catalog this registry routes against.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Strategy responsible for `schema_id`.
    ///
    /// # Errors
    ///
    /// - `UnknownSchema` if the catalog has no such ID
    /// - `UnknownFormat` if the entry's type has no registered strategy
    pub fn dispatch(&self, schema_id: &str) -> Result<&dyn FormatStrategy> {
        let entry = self.catalog.entry(schema_id)?;
        entry
            .format()
            .and_then(|format| self.strategies.get(&format))
            .map(Box::as_ref)
            .ok_or_else(|| RegistryError::unknown_format(schema_id, &entry.format_tag))
    }

    /// Convert text `input` to the binary form of `schema_id`.
    pub fn serialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        self.dispatch(schema_id)?
            .serialize(schema_id, message, input, output, params)
    }

    /// Convert binary `input` to the text form of `schema_id`.
    pub fn deserialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        self.dispatch(schema_id)?
            .deserialize(schema_id, message, input, output, params)
    }

    /// Known messages of a loaded schema.
    pub fn message_index(&self, schema_id: &str) -> Option<&MessageIndex> {
        let format = self.catalog.get(schema_id)?.format()?;
        self.strategies.get(&format)?.message_index(schema_id)
    }

    /// Formats with a registered strategy, in declaration order.
    pub fn registered_formats(&self) -> Vec<SchemaFormat> {
        SchemaFormat::ALL
            .iter()
            .copied()
            .filter(|format| self.strategies.contains_key(format))
            .collect()
    }

    /// IDs of every schema loaded by any strategy, sorted.
    pub fn loaded_schemas(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .strategies
            .values()
            .flat_map(|strategy| strategy.loaded_schemas())
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for DispatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRegistry")
            .field("generation", &self.catalog.generation())
            .field("formats", &self.registered_formats())
            .finish()
    }
}
