// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Schemacodec CLI
//!
//! Command-line front end to the schema registry.
//!
//! ## Usage
//!
//! ```sh
//! # Text to binary, base64 wrapped
//! schemacodec --catalog catalog.json --root schemas encode addr-book -m Person -f base64 -i person.txt
//!
//! # Binary to text
//! schemacodec decode addr-book -i person.bin
//!
//! # Thrift compact protocol
//! schemacodec decode events -p thrift.protocol=compact -i event.bin
//!
//! # Catalog information
//! schemacodec info addr-book
//! schemacodec deps addr-book
//! schemacodec check
//! ```

mod cmd;
mod common;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use cmd::{CheckCmd, ConvertArgs, DepsCmd, InfoCmd, SchemaCmd};
use common::{Direction, GlobalOptions, Result};

/// Schemacodec - schema registry conversions
///
/// Convert messages between text and binary forms for Avro, Protobuf and
/// Thrift schemas listed in a catalog.
#[derive(Parser, Clone)]
#[command(name = "schemacodec")]
#[command(about = "Convert Avro, Protobuf and Thrift messages between text and binary", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Configuration file (default: search for schemacodec.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Catalog JSON file
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Directory holding one subdirectory per schema
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Convert text to binary
    Encode(ConvertArgs),

    /// Convert binary to text
    Decode(ConvertArgs),

    /// Show catalog information, including discovered messages
    Info(InfoCmd),

    /// Print the raw schema source
    Schema(SchemaCmd),

    /// List the transitive dependencies of a schema
    Deps(DepsCmd),

    /// Load every schema and report failures
    Check(CheckCmd),
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = GlobalOptions {
        config: cli.config,
        catalog: cli.catalog,
        root: cli.root,
    };

    match cli.command {
        Commands::Encode(args) => args.run(&options, Direction::Encode),
        Commands::Decode(args) => args.run(&options, Direction::Decode),
        Commands::Info(cmd) => cmd.run(&options),
        Commands::Schema(cmd) => cmd.run(&options),
        Commands::Deps(cmd) => cmd.run(&options),
        Commands::Check(cmd) => cmd.run(&options),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
