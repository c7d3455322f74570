// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema catalog, dependency graph and per-schema artifact loading.
//!
//! This module provides:
//! - [`Catalog`] - the parsed schema catalog, one [`SchemaEntry`] per ID
//! - [`DependencyResolver`] - transitive dependency closures over the catalog
//! - [`loader`] - isolated search paths, manifests and message classification

pub mod catalog;
pub mod loader;
pub mod resolver;

pub use catalog::{Catalog, SchemaEntry};
pub use loader::{ArtifactClass, ClassifiedArtifact, MessageIndex, SearchPath};
pub use resolver::DependencyResolver;
