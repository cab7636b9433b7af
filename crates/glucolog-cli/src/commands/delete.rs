//! Delete command.

use std::sync::Arc;

use anyhow::{Result, bail};
use glucolog_cli::config::Config;

use super::{SelectedScan, open_log_view};

/// Execute the delete command.
pub async fn cmd_delete(id: &str, config: &Config) -> Result<()> {
    let view = open_log_view(config, Arc::new(SelectedScan::default()))?;
    let deleted = view.delete(id).await?;
    view.close().await?;

    if !deleted {
        bail!("No scan with id '{}'", id);
    }
    println!("Deleted {}", id);
    Ok(())
}
