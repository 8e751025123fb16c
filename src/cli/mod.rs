//! CLI command definitions for confmap
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod get;
pub mod merge;
pub mod paths;

use crate::document::{Document, parse_document};
use crate::logging::LogTarget;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use get::GetArgs;
use merge::MergeArgs;
use paths::PathsArgs;
use std::fs;
use std::path::Path;

/// Merge, inspect and query YAML configuration files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", env = "CONFMAP_LOG", global = true)]
    pub log: LogTarget,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge a defaults file into a configuration file
    Merge(MergeArgs),

    /// Print the value stored at a dotted key
    Get(GetArgs),

    /// List the dotted path of every leaf value
    Paths(PathsArgs),
}

fn read_document(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = parse_document(&text, &path.display().to_string())?;
    Ok(doc)
}
