// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Per-schema artifact loading.
//!
//! Code-loaded formats (Protobuf, Thrift) resolve their message definitions
//! from generated artifacts found on an isolated [`SearchPath`]: the schema's
//! own directory followed by the directories of its dependency closure, and
//! nothing else. The manifest file `<root>/<id>/MANIFEST` names the primary
//! artifacts, one per line.
//!
//! After loading, every schema is summarized by a [`MessageIndex`]: the set
//! of message names it defines plus the default message, if one can be
//! inferred.

pub mod protobuf;
pub mod thrift;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{RegistryError, Result};
use crate::schema::Catalog;

/// Name of the manifest file in each code-loaded schema directory.
pub const MANIFEST_FILE: &str = "MANIFEST";

/// Ordered, isolated list of directories a schema may load artifacts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    schema_id: String,
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Build the search path for `schema_id` from its dependency closure.
    ///
    /// A dependency that the catalog does not define is a load failure when
    /// `require_dependencies` is set, and is skipped with a warning otherwise.
    pub fn for_schema(
        catalog: &Catalog,
        schema_id: &str,
        closure: &[String],
        require_dependencies: bool,
    ) -> Result<Self> {
        let mut dirs = vec![catalog.schema_dir(schema_id)];
        for dependency in closure {
            if catalog.contains(dependency) {
                dirs.push(catalog.schema_dir(dependency));
            } else if require_dependencies {
                return Err(RegistryError::load_failure(
                    schema_id,
                    format!("dependency '{dependency}' is not in the catalog"),
                ));
            } else {
                tracing::warn!(
                    schema = %schema_id,
                    dependency = %dependency,
                    "ignoring dependency missing from the catalog"
                );
            }
        }

        Ok(Self {
            schema_id: schema_id.to_string(),
            dirs,
        })
    }

    /// Schema this path belongs to.
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    /// Directories in lookup order; the schema's own directory comes first.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// The schema's own directory.
    pub fn own_dir(&self) -> &Path {
        &self.dirs[0]
    }

    /// Files with one of `extensions` in every directory on the path.
    ///
    /// Directories are scanned in lookup order and files sorted by name
    /// within each directory. A missing dependency directory contributes
    /// nothing; a missing own directory is a load failure.
    pub fn find_files(&self, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for (position, dir) in self.dirs.iter().enumerate() {
            let listing = match fs::read_dir(dir) {
                Ok(listing) => listing,
                Err(e) if position == 0 => {
                    return Err(RegistryError::load_failure(
                        &self.schema_id,
                        format!("cannot read {}: {e}", dir.display()),
                    ));
                }
                Err(e) => {
                    tracing::debug!(
                        schema = %self.schema_id,
                        path = %dir.display(),
                        error = %e,
                        "skipping unreadable dependency directory"
                    );
                    continue;
                }
            };

            let mut files: Vec<PathBuf> = listing
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && has_extension(path, extensions))
                .collect();
            files.sort();
            found.extend(files);
        }
        Ok(found)
    }

    /// Read the primary artifact names from the schema's manifest.
    pub fn read_manifest(&self) -> Result<Vec<String>> {
        read_manifest(self.own_dir(), &self.schema_id)
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
}

/// Read `<dir>/MANIFEST`: one artifact name per line, blank lines and `#`
/// comments ignored.
pub fn read_manifest(dir: &Path, schema_id: &str) -> Result<Vec<String>> {
    let path = dir.join(MANIFEST_FILE);
    let text = fs::read_to_string(&path).map_err(|e| {
        RegistryError::load_failure(schema_id, format!("cannot read {}: {e}", path.display()))
    })?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Classification of a message-capable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactClass {
    /// Ordinary message type
    Message,
    /// Error-like message type (e.g. a Thrift exception)
    ErrorMessage,
}

/// A primary artifact accepted by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedArtifact {
    /// Simple name of the artifact
    pub name: String,
    /// How the artifact was classified
    pub class: ArtifactClass,
}

impl ClassifiedArtifact {
    /// Create a classified artifact.
    pub fn new(name: impl Into<String>, class: ArtifactClass) -> Self {
        Self {
            name: name.into(),
            class,
        }
    }
}

/// Default message for single-class formats: the only top-level message.
pub fn infer_single_class_default<S: AsRef<str>>(top_level: &[S]) -> Option<String> {
    match top_level {
        [only] => Some(only.as_ref().to_string()),
        _ => None,
    }
}

/// Default message for multi-class formats: the only artifact, else the only
/// non-error artifact, else none.
pub fn infer_multi_class_default(artifacts: &[ClassifiedArtifact]) -> Option<String> {
    if let [only] = artifacts {
        return Some(only.name.clone());
    }

    let mut ordinary = artifacts
        .iter()
        .filter(|artifact| artifact.class == ArtifactClass::Message);
    match (ordinary.next(), ordinary.next()) {
        (Some(only), None) => Some(only.name.clone()),
        _ => None,
    }
}

/// Known message names of one loaded schema plus its default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageIndex {
    known: BTreeSet<String>,
    default: Option<String>,
}

impl MessageIndex {
    /// Create an index. The default, when given, is added to the known set.
    pub fn new<I, S>(known: I, default: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut known: BTreeSet<String> = known.into_iter().map(Into::into).collect();
        if let Some(default) = &default {
            known.insert(default.clone());
        }
        Self { known, default }
    }

    /// Index of a schema that defines exactly one message.
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new([name.clone()], Some(name))
    }

    /// Known message names, sorted.
    pub fn known(&self) -> &BTreeSet<String> {
        &self.known
    }

    /// Inferred default message name.
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Whether `name` is a known message.
    pub fn contains(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Whether the schema defines no message at all.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Resolve the message to use for a request.
    ///
    /// An absent or empty name selects the default. Fails with
    /// `UnknownMessage` (listing the known names) when there is no default
    /// or the name is not defined.
    pub fn resolve<'a>(&'a self, schema_id: &str, requested: Option<&str>) -> Result<&'a str> {
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());
        let resolved = match requested {
            Some(name) => self.known.get(name).map(String::as_str),
            None => self.default(),
        };

        resolved.ok_or_else(|| {
            RegistryError::unknown_message(
                schema_id,
                requested.unwrap_or_default(),
                self.known.iter().cloned(),
            )
        })
    }
}
