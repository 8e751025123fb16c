//! Merge subcommand for confmap CLI
//!
//! Fills a configuration file with the keys of a defaults file it lacks.

use super::read_document;
use crate::document::Document;
use crate::merge::merge_defaults;
use anyhow::{Context, Result};
use clap::Args;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Arguments for the merge subcommand
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Defaults file shipped with the application
    #[arg(short, long, value_name = "FILE")]
    pub defaults: PathBuf,

    /// User configuration file (created if missing)
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// Dotted path owned by the user; defaults never fill it (repeatable)
    #[arg(short, long, value_name = "PATH")]
    pub changeable: Vec<String>,

    /// Write the merged document back to the file and print a JSON report of
    /// the filled paths instead of printing the document
    #[arg(short, long)]
    pub write: bool,
}

/// Run the merge command.
pub fn run_merge(args: &MergeArgs, out: &mut impl Write) -> Result<()> {
    let defaults = read_document(&args.defaults)?;
    let mut current = if args.file.exists() {
        read_document(&args.file)?
    } else {
        debug!(path = %args.file.display(), "configuration file missing, starting empty");
        Document::new()
    };

    let changeable: BTreeSet<String> = args.changeable.iter().cloned().collect();
    let report = merge_defaults(&defaults, &mut current, &changeable);
    info!(
        filled = report.filled.len(),
        replaced = report.replaced_sequences.len(),
        "merge complete"
    );

    let text = serde_yaml::to_string(&current).context("Failed to render merged document")?;
    if !args.write {
        write!(out, "{}", text)?;
        return Ok(());
    }

    if let Some(parent) = args.file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&args.file, text)
        .with_context(|| format!("Failed to write {}", args.file.display()))?;
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
