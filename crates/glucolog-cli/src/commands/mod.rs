//! Command implementations for the CLI.

mod delete;
mod log;
mod show;
mod status;
mod sync;
mod transfer;

pub use delete::cmd_delete;
pub use log::cmd_log;
pub use show::cmd_show;
pub use status::cmd_status;
pub use sync::{SyncArgs, cmd_sync};
pub use transfer::{cmd_export, cmd_import};

use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use glucolog_cli::config::Config;
use glucolog_cli::format::FormatOptions;
use glucolog_cli::log_view::{LogView, ScanDataListener};
use glucolog_store::Store;
use glucolog_types::ReadingData;

use crate::cli::OutputArgs;

/// Open the configured database.
fn open_store(config: &Config) -> Result<Store> {
    Store::open(&config.storage.path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.storage.path.display()
        )
    })
}

/// Open the scan log over the configured database.
fn open_log_view(config: &Config, listener: std::sync::Arc<SelectedScan>) -> Result<LogView> {
    LogView::open(&config.storage.path, listener).with_context(|| {
        format!(
            "Failed to open database {}",
            config.storage.path.display()
        )
    })
}

fn format_options(output: &OutputArgs, config: &Config, no_color: bool) -> FormatOptions {
    FormatOptions::new(output.resolve_unit(config.display.unit), no_color)
        .with_no_header(output.no_header)
}

/// Keeps the scan selected in the log for printing.
#[derive(Default)]
struct SelectedScan {
    selected: Mutex<Option<ReadingData>>,
}

impl SelectedScan {
    fn take(&self) -> Option<ReadingData> {
        self.selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl ScanDataListener for SelectedScan {
    fn on_show_scan_data(&self, data: &ReadingData) {
        *self
            .selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(data.clone());
    }
}
