// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Encode and decode commands.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;

use crate::common::{build_params, Direction, GlobalOptions, Result};

/// Arguments shared by `encode` and `decode`.
#[derive(Args, Clone, Debug)]
pub struct ConvertArgs {
    /// Schema ID from the catalog
    #[arg(value_name = "ID")]
    schema_id: String,

    /// Message name (default: the schema's default message)
    #[arg(short, long, value_name = "NAME")]
    message: Option<String>,

    /// Filter chain applied to the binary side, e.g. "gzip,base64"
    #[arg(short, long, value_name = "LIST")]
    filters: Option<String>,

    /// Extra parameter, e.g. avro.payload=file (repeatable)
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Input file (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl ConvertArgs {
    pub fn run(self, options: &GlobalOptions, direction: Direction) -> Result<()> {
        let params = build_params(
            self.message.as_deref(),
            self.filters.as_deref(),
            &self.params,
        )?;
        let registry = options.open_registry()?;

        let mut input: Box<dyn Read> = match &self.input {
            Some(path) => Box::new(BufReader::new(
                File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
            )),
            None => Box::new(io::stdin().lock()),
        };
        let mut output: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
            )),
            None => Box::new(io::stdout().lock()),
        };

        match direction {
            Direction::Encode => {
                registry.encode(&self.schema_id, &mut input, &mut output, &params)?
            }
            Direction::Decode => {
                registry.decode(&self.schema_id, &mut input, &mut output, &params)?
            }
        }
        output.flush()?;
        Ok(())
    }
}
