// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Service configuration.
//!
//! Read from a TOML file:
//!
//! ```toml
//! catalog = "/srv/schemas/catalog.json"
//! root_directory = "/srv/schemas"
//! reload_interval_secs = 5
//! initial_delay_secs = 5
//! ```
//!
//! [`ServiceConfig::discover`] looks for `schemacodec.toml` in the working
//! directory, then the home directory, then `/etc/schemacodec/`. Command
//! line values override file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::{RegistryError, Result};

/// File name searched for by [`ServiceConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "schemacodec.toml";

/// Seconds between catalog checks unless configured otherwise.
pub const DEFAULT_RELOAD_INTERVAL_SECS: i64 = 5;

/// Seconds before the first catalog check unless configured otherwise.
pub const DEFAULT_INITIAL_DELAY_SECS: i64 = 5;

fn default_reload_interval() -> i64 {
    DEFAULT_RELOAD_INTERVAL_SECS
}

fn default_initial_delay() -> i64 {
    DEFAULT_INITIAL_DELAY_SECS
}

/// Where the catalog lives and how often to reload it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Catalog JSON file.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Directory holding one subdirectory per schema.
    #[serde(default)]
    pub root_directory: Option<PathBuf>,
    #[serde(default = "default_reload_interval")]
    pub reload_interval_secs: i64,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            root_directory: None,
            reload_interval_secs: DEFAULT_RELOAD_INTERVAL_SECS,
            initial_delay_secs: DEFAULT_INITIAL_DELAY_SECS,
        }
    }
}

impl ServiceConfig {
    /// Parse a TOML document.
    pub fn parse(source: &str, text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| RegistryError::invalid_input("config", format!("{source}: {e}")))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| RegistryError::Io {
            kind: e.kind(),
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config = Self::parse(&path.display().to_string(), &text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Candidate configuration files, in search order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_FILE_NAME));
        }
        paths.push(Path::new("/etc/schemacodec").join(CONFIG_FILE_NAME));
        paths
    }

    /// Load the first configuration file found on the search path, or the
    /// defaults when there is none.
    pub fn discover() -> Result<Self> {
        match Self::search_paths().into_iter().find(|path| path.is_file()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Replace file values with any given on the command line.
    pub fn with_overrides(mut self, catalog: Option<PathBuf>, root: Option<PathBuf>) -> Self {
        if catalog.is_some() {
            self.catalog = catalog;
        }
        if root.is_some() {
            self.root_directory = root;
        }
        self
    }

    /// Catalog file and root directory, both of which must be set.
    pub fn require_paths(&self) -> Result<(&Path, &Path)> {
        let catalog = self.catalog.as_deref().ok_or_else(|| {
            RegistryError::invalid_input("config", "no catalog file configured")
        })?;
        let root = self.root_directory.as_deref().ok_or_else(|| {
            RegistryError::invalid_input("config", "no schema root directory configured")
        })?;
        Ok((catalog, root))
    }

    /// Time between catalog checks; non-positive values fall back to the
    /// default.
    pub fn reload_interval(&self) -> Duration {
        let secs = if self.reload_interval_secs > 0 {
            self.reload_interval_secs
        } else {
            DEFAULT_RELOAD_INTERVAL_SECS
        };
        Duration::from_secs(secs.unsigned_abs())
    }

    /// Time before the first catalog check; negative values mean none.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs.max(0).unsigned_abs())
    }
}
