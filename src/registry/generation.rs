// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! One immutable build of the catalog and every strategy.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use chrono::{DateTime, Utc};

use super::dispatch::DispatchRegistry;
use crate::core::{RegistryError, Result};
use crate::encoding::{
    AvroStrategy, FormatStrategy, LoadContext, ProtobufStrategy, ThriftStrategy,
};
use crate::schema::{Catalog, DependencyResolver};

/// Change marker of the catalog file: modification time and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMarker {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl SourceMarker {
    /// Read the marker of `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

/// A fully built registry generation.
///
/// Requests hold an `Arc<Generation>` for their whole duration; a newer
/// generation never mutates this one.
#[derive(Debug)]
pub struct Generation {
    number: u64,
    catalog: Arc<Catalog>,
    registry: DispatchRegistry,
    marker: Option<SourceMarker>,
    built_at: DateTime<Utc>,
    failures: Vec<RegistryError>,
}

impl Generation {
    /// Build generation `number` from the catalog file at `catalog_path`.
    ///
    /// Schemas that fail to load are logged and left out; only a catalog
    /// that cannot be read or parsed fails the build.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::CatalogBuild` for an unusable catalog.
    pub fn build(catalog_path: &Path, root_directory: &Path, number: u64) -> Result<Self> {
        let started = Instant::now();
        // taken before reading so a concurrent edit triggers another reload
        let marker = SourceMarker::read(catalog_path).ok();
        let catalog = Catalog::load(catalog_path, root_directory, number)?;
        Ok(Self::assemble(catalog, marker, started))
    }

    /// Build a generation from an already parsed catalog.
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self::assemble(catalog, None, Instant::now())
    }

    fn assemble(mut catalog: Catalog, marker: Option<SourceMarker>, started: Instant) -> Self {
        let number = catalog.generation();
        let closures = DependencyResolver::new(&catalog).resolve_all();

        let mut ctx = LoadContext::new(&catalog, &closures);
        let avro = AvroStrategy::load(&mut ctx);
        let protobuf = ProtobufStrategy::load(&mut ctx);
        let thrift = ThriftStrategy::load(&mut ctx);
        let failures = ctx.into_failures();

        let strategies: [&dyn FormatStrategy; 3] = [&avro, &protobuf, &thrift];
        for strategy in strategies {
            for id in strategy.loaded_schemas() {
                if let Some(index) = strategy.message_index(id) {
                    catalog.record_messages(id, index);
                }
            }
        }

        let catalog = Arc::new(catalog);
        let mut registry = DispatchRegistry::new(Arc::clone(&catalog));
        registry.register(Box::new(avro));
        registry.register(Box::new(protobuf));
        registry.register(Box::new(thrift));

        tracing::info!(
            generation = number,
            schemas = catalog.len(),
            loaded = registry.loaded_schemas().len(),
            failed = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built registry generation"
        );

        Self {
            number,
            catalog,
            registry,
            marker,
            built_at: Utc::now(),
            failures,
        }
    }

    /// Generation number, increasing with every successful reload.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Catalog of this generation, with discovered messages recorded.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Strategies of this generation.
    pub fn registry(&self) -> &DispatchRegistry {
        &self.registry
    }

    /// Catalog file marker captured at build time.
    pub fn marker(&self) -> Option<SourceMarker> {
        self.marker
    }

    /// Completion time of the build.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Schemas left unloaded, one `LoadFailure` each.
    pub fn load_failures(&self) -> &[RegistryError] {
        &self.failures
    }
}
