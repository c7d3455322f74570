// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Deps command - transitive dependency closure of a schema.

use clap::Args;
use schemacodec::DependencyResolver;

use crate::common::{GlobalOptions, Result};

/// List the dependency closure, one ID per line.
#[derive(Args, Clone, Debug)]
pub struct DepsCmd {
    /// Schema ID
    #[arg(value_name = "ID")]
    schema_id: String,
}

impl DepsCmd {
    pub fn run(self, options: &GlobalOptions) -> Result<()> {
        let catalog = options.open_catalog()?;
        catalog.entry(&self.schema_id)?;

        for id in DependencyResolver::new(&catalog).resolve(&self.schema_id) {
            if catalog.contains(&id) {
                println!("{id}");
            } else {
                println!("{id} (missing from catalog)");
            }
        }
        Ok(())
    }
}
