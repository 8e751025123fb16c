//! Get subcommand for confmap CLI

use super::read_document;
use crate::document::lookup;
use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use std::io::Write;
use std::path::PathBuf;

/// Arguments for the get subcommand
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Configuration file to read
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// Dotted key, e.g. `server.port`
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Output format for printed values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Run the get command.
pub fn run_get(args: &GetArgs, out: &mut impl Write) -> Result<()> {
    let doc = read_document(&args.file)?;
    let Some(value) = lookup(&doc, &args.key) else {
        bail!("No value at '{}' in {}", args.key, args.file.display());
    };
    match args.format {
        OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(value)?)?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(value)?)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("app.yml");
        fs::write(&file, "server:\n  port: 8080\n  tags: [a, b]\n").unwrap();
        (temp, file)
    }

    fn run(file: PathBuf, key: &str, format: OutputFormat) -> Result<String> {
        let args = GetArgs {
            file,
            key: key.to_string(),
            format,
        };
        let mut out = Vec::new();
        run_get(&args, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_get_prints_yaml() {
        let (_temp, file) = setup();
        assert_eq!(run(file, "server.port", OutputFormat::Yaml).unwrap(), "8080\n");
    }

    #[test]
    fn test_get_prints_json() {
        let (_temp, file) = setup();
        let printed = run(file, "server", OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(value, serde_json::json!({"port": 8080, "tags": ["a", "b"]}));
    }

    #[test]
    fn test_get_missing_key_fails() {
        let (_temp, file) = setup();
        let err = run(file, "server.host", OutputFormat::Yaml).unwrap_err();
        assert!(err.to_string().contains("No value at 'server.host'"));
    }
}
