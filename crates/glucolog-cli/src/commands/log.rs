//! Log command - list scans newest first.

use std::sync::Arc;

use anyhow::Result;
use glucolog_cli::config::Config;
use glucolog_cli::format::{format_log_csv, format_log_json, format_log_text};

use super::{SelectedScan, format_options, open_log_view};
use crate::cli::{OutputArgs, OutputFormat};

/// Execute the log command.
pub async fn cmd_log(
    limit: Option<usize>,
    output: &OutputArgs,
    config: &Config,
    no_color: bool,
) -> Result<()> {
    let view = open_log_view(config, Arc::new(SelectedScan::default()))?;
    let records = view.records().await?;
    let shown = &records[..limit.unwrap_or(records.len()).min(records.len())];

    let opts = format_options(output, config, no_color);
    let content = match output.format {
        OutputFormat::Json => format!("{}\n", format_log_json(shown)?),
        OutputFormat::Csv => format_log_csv(shown, &opts),
        OutputFormat::Text => format_log_text(shown, &opts),
    };
    print!("{}", content);

    view.close().await?;
    Ok(())
}
