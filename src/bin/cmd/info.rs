// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Info command - catalog entries with their discovered messages.

use clap::Args;

use crate::common::{GlobalOptions, Result};

/// Show catalog information as JSON.
#[derive(Args, Clone, Debug)]
pub struct InfoCmd {
    /// Schema ID (default: every schema)
    #[arg(value_name = "ID")]
    schema_id: Option<String>,
}

impl InfoCmd {
    pub fn run(self, options: &GlobalOptions) -> Result<()> {
        let registry = options.open_registry()?;
        let generation = registry.snapshot();
        let catalog = generation.catalog();

        let json = match &self.schema_id {
            Some(id) => catalog.entry_json_pretty(id)?,
            None => catalog.to_json_pretty()?,
        };
        println!("{json}");
        Ok(())
    }
}
