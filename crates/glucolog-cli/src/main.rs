use std::io;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use glucolog_cli::config::Config;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::SyncArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "glucolog", &mut io::stdout());
        return Ok(());
    }

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so JSON and CSV output stay pipeable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = load_config(&cli)?;
    let no_color =
        cli.no_color || config.display.no_color || std::env::var_os("NO_COLOR").is_some();

    match cli.command {
        Commands::Log { limit, output } => {
            commands::cmd_log(limit, &output, &config, no_color).await
        }
        Commands::Show { id, output } => commands::cmd_show(&id, &output, &config, no_color).await,
        Commands::Delete { id } => commands::cmd_delete(&id, &config).await,
        Commands::Import { file } => commands::cmd_import(&file, &config),
        Commands::Export { output } => commands::cmd_export(output.as_deref(), &config),
        Commands::Sync {
            direction,
            triggered,
            network,
            directory,
            format,
        } => {
            let args = SyncArgs {
                direction: direction.into(),
                triggered,
                network,
                directory,
                format,
                quiet: cli.quiet,
            };
            commands::cmd_sync(args, &config).await
        }
        Commands::Status { format } => commands::cmd_status(format, &config),
        // Handled above
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the config file (explicit path, or the default location if present)
/// and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_default().context("Failed to load config")?,
    };

    if let Some(database) = &cli.database {
        config.storage.path = database.clone();
    }

    config.validate()?;
    Ok(config)
}
