//! Status command - database, preference and network summary.

use anyhow::Result;
use glucolog_cli::config::Config;
use glucolog_cli::format::format_date;
use glucolog_store::ReadingDataQuery;
use glucolog_sync::{StaticConnectivity, check_sync_gate};

use super::open_store;
use crate::cli::OutputFormat;

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// Execute the status command.
pub fn cmd_status(format: OutputFormat, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let total = store.count_reading_data(&ReadingDataQuery::new())?;
    let with_trend = store.count_reading_data(&ReadingDataQuery::log())?;
    let latest = store
        .query_reading_data(&ReadingDataQuery::log().limit(1))?
        .into_iter()
        .next();

    let network = config.network.active_network();
    let gate = check_sync_gate(&config.sync, &StaticConnectivity::new(Some(network)));

    match format {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "database": config.storage.path,
                "total_scans": total,
                "log_scans": with_trend,
                "latest": latest.as_ref().map(|r| &r.id),
                "cloud_directory": config.cloud.directory,
                "auto_sync": config.sync.auto_sync,
                "auto_sync_mobile": config.sync.auto_sync_mobile,
                "network": network,
                "triggered_sync_allowed": gate.is_ok(),
                "triggered_sync_refusal": gate.err().map(|r| r.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("Database:          {}", config.storage.path.display());
            println!("Scans:             {} ({} in log)", total, with_trend);
            match &latest {
                Some(record) => println!(
                    "Latest scan:       {} ({})",
                    format_date(record.date),
                    record.id
                ),
                None => println!("Latest scan:       none"),
            }
            println!("Cloud directory:   {}", config.cloud.directory.display());
            println!("Auto sync:         {}", on_off(config.sync.auto_sync));
            println!(
                "Auto sync mobile:  {}",
                on_off(config.sync.auto_sync_mobile)
            );
            println!(
                "Network:           {} ({})",
                network.network_type,
                if network.is_connected_or_connecting() {
                    "connected"
                } else {
                    "disconnected"
                }
            );
            match gate {
                Ok(()) => println!("Triggered sync:    allowed"),
                Err(reason) => println!("Triggered sync:    refused, {}", reason),
            }
        }
    }
    Ok(())
}
