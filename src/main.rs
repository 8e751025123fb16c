//! confmap command-line tool
//!
//! Merges shipped defaults into user configuration files and inspects
//! configuration documents without a typed schema.

use anyhow::Result;
use clap::Parser;
use confmap::cli::get::run_get;
use confmap::cli::merge::run_merge;
use confmap::cli::paths::run_paths;
use confmap::cli::{Cli, Command};
use confmap::logging::init_tracing;
use std::io;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log, cli.verbose)?;

    let mut stdout = io::stdout().lock();
    match cli.command {
        Command::Merge(args) => run_merge(&args, &mut stdout)?,
        Command::Get(args) => run_get(&args, &mut stdout)?,
        Command::Paths(args) => run_paths(&args, &mut stdout)?,
    }

    Ok(())
}
