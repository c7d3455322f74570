// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Check command - load every schema once and report the result.

use clap::Args;
use schemacodec::RegistryError;

use crate::common::{GlobalOptions, Result};

/// Build one generation and report loaded and failed schemas.
#[derive(Args, Clone, Debug)]
pub struct CheckCmd {
    /// Only print failures and the summary
    #[arg(short, long)]
    quiet: bool,
}

impl CheckCmd {
    pub fn run(self, options: &GlobalOptions) -> Result<()> {
        let registry = options.open_registry()?;
        let generation = registry.snapshot();
        let catalog = generation.catalog();

        if !self.quiet {
            for id in generation.registry().loaded_schemas() {
                let default = catalog
                    .get(id)
                    .and_then(|entry| entry.default_message())
                    .unwrap_or("-");
                println!("ok      {id} (default message: {default})");
            }
        }

        for failure in generation.load_failures() {
            match failure {
                RegistryError::LoadFailure { schema_id, reason } => {
                    println!("FAILED  {schema_id}: {reason}")
                }
                other => println!("FAILED  {other}"),
            }
        }

        let unsupported: Vec<&str> = catalog
            .entries()
            .filter(|entry| entry.format().is_none())
            .map(|entry| entry.id.as_str())
            .collect();
        for id in &unsupported {
            println!("SKIPPED {id}: unsupported schema type");
        }

        let failed = generation.load_failures().len();
        println!(
            "{} schemas, {} loaded, {} failed, {} unsupported",
            catalog.len(),
            generation.registry().loaded_schemas().len(),
            failed,
            unsupported.len()
        );

        if failed > 0 {
            anyhow::bail!("{failed} schema(s) failed to load");
        }
        Ok(())
    }
}
