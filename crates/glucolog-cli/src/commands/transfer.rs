//! Import and export commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glucolog_cli::config::Config;
use tracing::info;

use super::open_store;

/// Execute the import command.
pub fn cmd_import(file: &Path, config: &Config) -> Result<()> {
    let json = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let store = open_store(config)?;
    let result = store
        .import_json(&json)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!(
        "Imported {} scans ({} already present)",
        result.imported, result.skipped
    );
    Ok(())
}

/// Execute the export command.
pub fn cmd_export(output: Option<&Path>, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let json = store.export_json().context("Failed to export scans")?;

    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Exported scans to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
