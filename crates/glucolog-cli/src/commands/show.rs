//! Show command - print one scan with both series.

use std::sync::Arc;

use anyhow::{Result, bail};
use glucolog_cli::config::Config;
use glucolog_cli::format::{as_json, format_scan_csv, format_scan_text};

use super::{SelectedScan, format_options, open_log_view};
use crate::cli::{OutputArgs, OutputFormat};

/// Execute the show command.
pub async fn cmd_show(id: &str, output: &OutputArgs, config: &Config, no_color: bool) -> Result<()> {
    let selection = Arc::new(SelectedScan::default());
    let view = open_log_view(config, Arc::clone(&selection))?;

    let found = view.show(id).await?;
    view.close().await?;

    let Some(record) = selection.take().filter(|_| found) else {
        bail!("No scan with id '{}'", id);
    };

    let opts = format_options(output, config, no_color);
    match output.format {
        OutputFormat::Json => println!("{}", as_json(&record)?),
        OutputFormat::Csv => print!("{}", format_scan_csv(&record, &opts)),
        OutputFormat::Text => print!("{}", format_scan_text(&record, &opts)),
    }
    Ok(())
}
