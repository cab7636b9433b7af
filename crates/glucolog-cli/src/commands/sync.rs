//! Sync command - upload to or download from the cloud directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use glucolog_cli::config::Config;
use glucolog_cli::format::format_date;
use glucolog_store::ReadingDataQuery;
use glucolog_sync::{
    DirectoryBackend, StaticConnectivity, SyncCoordinator, SyncDirection, SyncObserver,
    SyncOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::info;

use super::open_store;
use crate::cli::{NetworkArg, OutputFormat};

/// Arguments for the sync command.
pub struct SyncArgs {
    pub direction: SyncDirection,
    pub triggered: bool,
    pub network: Option<NetworkArg>,
    pub directory: Option<PathBuf>,
    pub format: OutputFormat,
    pub quiet: bool,
}

fn sync_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("###");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Drives a progress bar from coordinator updates.
struct ProgressObserver {
    pb: ProgressBar,
}

impl SyncObserver for ProgressObserver {
    fn update_progress(&self, progress: f32, at: OffsetDateTime) {
        self.pb.set_position((progress * 100.0).round() as u64);
        self.pb.set_message(format_date(at));
    }

    fn finished(&self) {
        self.pb.finish_and_clear();
    }
}

/// Execute the sync command.
pub async fn cmd_sync(args: SyncArgs, config: &Config) -> Result<()> {
    let store = Arc::new(Mutex::new(open_store(config)?));
    let directory = args
        .directory
        .unwrap_or_else(|| config.cloud.directory.clone());
    let network = match args.network {
        Some(network) => network.to_network(),
        None => Some(config.network.active_network()),
    };

    let coordinator = SyncCoordinator::new(
        Arc::new(DirectoryBackend::new(Arc::clone(&store), &directory)),
        Arc::new(config.sync),
        Arc::new(StaticConnectivity::new(network)),
    );

    if args.triggered
        && let Err(reason) = coordinator.gate()
    {
        match args.format {
            OutputFormat::Json => {
                let result = serde_json::json!({
                    "direction": args.direction,
                    "started": false,
                    "reason": reason.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            _ => println!("Sync skipped: {}", reason),
        }
        return Ok(());
    }

    if !args.quiet && args.format == OutputFormat::Text {
        println!("Syncing ({}) with {}...", args.direction, directory.display());
        coordinator.register_observer(Arc::new(ProgressObserver {
            pb: sync_progress_bar(),
        }));
    }

    let mut subscription = coordinator.subscribe();
    match (args.direction, args.triggered) {
        (SyncDirection::Upload, true) => coordinator.start_triggered_upload(),
        (SyncDirection::Upload, false) => coordinator.start_upload(),
        (SyncDirection::Download, true) => coordinator.start_triggered_download(),
        (SyncDirection::Download, false) => coordinator.start_download(),
    }

    let interrupted = tokio::select! {
        _ = subscription.wait_idle() => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        info!("Interrupted, cancelling sync");
        coordinator.cancel();
    }
    let status = subscription.wait_idle().await;
    coordinator.unregister_observer();

    let total = store
        .lock()
        .await
        .count_reading_data(&ReadingDataQuery::new())?;

    match args.format {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "direction": args.direction,
                "started": true,
                "outcome": status.last_outcome,
                "progress": status.progress,
                "total_scans": total,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => match &status.last_outcome {
            Some(SyncOutcome::Completed) => {
                println!("Sync complete");
                println!("Scans in database: {}", total);
            }
            Some(SyncOutcome::Cancelled) => println!("Sync cancelled"),
            _ => {}
        },
    }

    if let Some(SyncOutcome::Failed(message)) = status.last_outcome {
        bail!("Sync failed: {}", message);
    }
    Ok(())
}
