// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::path::PathBuf;

use schemacodec::core::params::{FILTERS, MESSAGE};
use schemacodec::{Catalog, Parameters, SchemaRegistry, ServiceConfig};

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Conversion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Text to binary
    Encode,
    /// Binary to text
    Decode,
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub root: Option<PathBuf>,
}

impl GlobalOptions {
    /// Configuration file merged with command line overrides.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let config = match &self.config {
            Some(path) => ServiceConfig::load(path)?,
            None => ServiceConfig::discover()?,
        };
        Ok(config.with_overrides(self.catalog.clone(), self.root.clone()))
    }

    /// Open the registry, building every schema.
    pub fn open_registry(&self) -> Result<SchemaRegistry> {
        let config = self.service_config()?;
        let (catalog, root) = config.require_paths()?;
        Ok(SchemaRegistry::open(catalog, root)?)
    }

    /// Parse the catalog only, without loading any schema.
    pub fn open_catalog(&self) -> Result<Catalog> {
        let config = self.service_config()?;
        let (catalog, root) = config.require_paths()?;
        Ok(Catalog::load(catalog, root, 0)?)
    }
}

/// Build request parameters; earlier values win over later `KEY=VALUE`
/// pairs for the same key.
pub fn build_params(
    message: Option<&str>,
    filters: Option<&str>,
    pairs: &[String],
) -> Result<Parameters> {
    let mut params = Parameters::new();
    if let Some(message) = message {
        params.insert(MESSAGE, message);
    }
    if let Some(filters) = filters {
        params.insert(FILTERS, filters);
    }
    for pair in pairs {
        params.insert_pair(pair)?;
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_params() {
        let params = build_params(
            Some("Person"),
            None,
            &["m=Other".to_string(), "protobuf.delimited=true".to_string()],
        )
        .unwrap();
        assert_eq!(params.get("m"), Some("Person"));
        assert!(params.flag("protobuf.delimited"));
        assert!(params.get("f").is_none());
    }

    #[test]
    fn test_build_params_rejects_bad_pair() {
        assert!(build_params(None, None, &["novalue".to_string()]).is_err());
    }
}
