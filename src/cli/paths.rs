//! Paths subcommand for confmap CLI

use super::read_document;
use crate::document::leaf_paths;
use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

/// Arguments for the paths subcommand
#[derive(Args, Debug)]
pub struct PathsArgs {
    /// Configuration file to read
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,
}

/// Run the paths command.
pub fn run_paths(args: &PathsArgs, out: &mut impl Write) -> Result<()> {
    let doc = read_document(&args.file)?;
    for path in leaf_paths(&doc) {
        writeln!(out, "{}", path)?;
    }
    Ok(())
}
