// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The live schema registry.
//!
//! [`SchemaRegistry`] holds the current [`Generation`] behind an
//! [`ArcSwap`]. Each request captures one generation with
//! [`snapshot`](SchemaRegistry::snapshot) and uses it to the end, even if a
//! reload publishes a newer one meanwhile.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use schemacodec::{Parameters, SchemaRegistry};
//!
//! let registry = SchemaRegistry::open("catalog.json", "/srv/schemas")?;
//! let params = Parameters::new().with("m", "Person").with("f", "base64");
//!
//! let mut output = Vec::new();
//! registry.encode(
//!     "addr-book",
//!     &mut "name: \"Ada\"\nid: 1\n".as_bytes(),
//!     &mut output,
//!     &params,
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod generation;
pub mod reload;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::core::params::MESSAGE;
use crate::core::{Parameters, Result};
use crate::io::FilterChain;

pub use dispatch::DispatchRegistry;
pub use generation::{Generation, SourceMarker};
pub use reload::{ReloadHandle, ReloadManager, ReloadOutcome, ReloadState};

/// Registry of every schema in one catalog, swapped atomically on reload.
pub struct SchemaRegistry {
    current: ArcSwap<Generation>,
    catalog_path: PathBuf,
    root_directory: PathBuf,
}

impl SchemaRegistry {
    /// Build the first generation from `catalog_path`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::CatalogBuild` if the catalog cannot be read or
    /// parsed. Individual schemas failing to load do not fail the call.
    pub fn open(catalog_path: impl AsRef<Path>, root_directory: impl AsRef<Path>) -> Result<Self> {
        let catalog_path = catalog_path.as_ref().to_path_buf();
        let root_directory = root_directory.as_ref().to_path_buf();
        let generation = Generation::build(&catalog_path, &root_directory, 1)?;
        Ok(Self::with_generation(generation, catalog_path, root_directory))
    }

    /// Wrap an already built generation.
    pub fn with_generation(
        generation: Generation,
        catalog_path: impl Into<PathBuf>,
        root_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            current: ArcSwap::from_pointee(generation),
            catalog_path: catalog_path.into(),
            root_directory: root_directory.into(),
        }
    }

    /// The current generation.
    pub fn snapshot(&self) -> Arc<Generation> {
        self.current.load_full()
    }

    /// Make `generation` current, returning the one it replaces.
    pub fn publish(&self, generation: Generation) -> Arc<Generation> {
        let number = generation.number();
        let previous = self.current.swap(Arc::new(generation));
        tracing::info!(
            generation = number,
            previous = previous.number(),
            "published registry generation"
        );
        previous
    }

    /// Catalog file this registry reloads from.
    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    /// Directory holding one subdirectory per schema.
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Convert text to binary with no filters applied.
    pub fn serialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        self.snapshot()
            .registry()
            .serialize(schema_id, message, input, output, params)
    }

    /// Convert binary to text with no filters applied.
    pub fn deserialize(
        &self,
        schema_id: &str,
        message: Option<&str>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        self.snapshot()
            .registry()
            .deserialize(schema_id, message, input, output, params)
    }

    /// Convert text to binary, taking the message name from `m` and
    /// wrapping the output in the filter chain named by `f`.
    ///
    /// The schema and the filter list are checked before any byte is
    /// written.
    pub fn encode(
        &self,
        schema_id: &str,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        let chain = FilterChain::from_params(params)?;
        let generation = self.snapshot();
        let strategy = generation.registry().dispatch(schema_id)?;

        let mut stream = chain.wrap_writer(Box::new(output))?;
        strategy.serialize(schema_id, params.get(MESSAGE), input, &mut stream, params)?;
        stream.finish()
    }

    /// Convert binary to text, unwrapping the input with the filter chain
    /// named by `f` and taking the message name from `m`.
    pub fn decode(
        &self,
        schema_id: &str,
        input: &mut dyn Read,
        output: &mut dyn Write,
        params: &Parameters,
    ) -> Result<()> {
        let chain = FilterChain::from_params(params)?;
        let generation = self.snapshot();
        let strategy = generation.registry().dispatch(schema_id)?;

        let mut reader = chain.wrap_reader(Box::new(input))?;
        strategy.deserialize(schema_id, params.get(MESSAGE), &mut reader, output, params)
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("generation", &self.snapshot().number())
            .field("catalog_path", &self.catalog_path)
            .field("root_directory", &self.root_directory)
            .finish()
    }
}
