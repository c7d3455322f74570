// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema command - print the raw schema source.

use std::io::{self, Write};

use clap::Args;

use crate::common::{GlobalOptions, Result};

/// Print the schema file, preferring its `.orig` copy.
#[derive(Args, Clone, Debug)]
pub struct SchemaCmd {
    /// Schema ID
    #[arg(value_name = "ID")]
    schema_id: String,
}

impl SchemaCmd {
    pub fn run(self, options: &GlobalOptions) -> Result<()> {
        let catalog = options.open_catalog()?;
        let source = catalog.read_source(&self.schema_id)?;

        let mut stdout = io::stdout().lock();
        stdout.write_all(&source)?;
        stdout.flush()?;
        Ok(())
    }
}
