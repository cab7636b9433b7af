//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use glucolog_sync::{NetworkInfo, NetworkType, SyncDirection};
use glucolog_types::GlucoseUnit;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Glucose unit argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    /// mg/dL
    Mgdl,
    /// mmol/L
    Mmol,
}

impl From<UnitArg> for GlucoseUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Mgdl => GlucoseUnit::MgDl,
            UnitArg::Mmol => GlucoseUnit::MmolL,
        }
    }
}

/// Active network override
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkArg {
    Wifi,
    Mobile,
    Ethernet,
    /// No active network
    None,
}

impl NetworkArg {
    pub fn to_network(self) -> Option<NetworkInfo> {
        let network_type = match self {
            NetworkArg::Wifi => NetworkType::Wifi,
            NetworkArg::Mobile => NetworkType::Mobile,
            NetworkArg::Ethernet => NetworkType::Ethernet,
            NetworkArg::None => return None,
        };
        Some(NetworkInfo::connected(network_type))
    }
}

/// Sync direction argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Local database to the cloud directory
    Upload,
    /// Cloud directory to the local database
    Download,
}

impl From<DirectionArg> for SyncDirection {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Upload => SyncDirection::Upload,
            DirectionArg::Download => SyncDirection::Download,
        }
    }
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Glucose unit (overrides config)
    #[arg(short, long, value_enum)]
    pub unit: Option<UnitArg>,

    /// Omit header row in CSV output (useful for appending)
    #[arg(long)]
    pub no_header: bool,
}

impl OutputArgs {
    /// Resolve the unit: explicit flag overrides config
    pub fn resolve_unit(&self, config_unit: GlucoseUnit) -> GlucoseUnit {
        self.unit.map(GlucoseUnit::from).unwrap_or(config_unit)
    }
}

#[derive(Parser)]
#[command(name = "glucolog")]
#[command(author, version, about = "Glucose sensor scan log with cloud sync", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file
    #[arg(long, global = true, env = "GLUCOLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file (overrides config)
    #[arg(long, global = true, env = "GLUCOLOG_DB")]
    pub database: Option<PathBuf>,

    /// Disable colored output (also honors NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List scans with a trend series, newest first
    Log {
        /// Show at most this many scans
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show one scan with its trend and history readings
    Show {
        /// Scan id, `<sensor>_<age minutes>`
        id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete a scan together with its readings
    Delete {
        /// Scan id, `<sensor>_<age minutes>`
        id: String,
    },

    /// Import scans from a JSON export
    Import {
        /// JSON file produced by `glucolog export`
        file: PathBuf,
    },

    /// Export every scan as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Synchronize with the cloud directory
    Sync {
        #[arg(value_enum)]
        direction: DirectionArg,

        /// Apply the automatic-sync checks (preferences and network)
        #[arg(long)]
        triggered: bool,

        /// Active network (overrides config)
        #[arg(long, value_enum)]
        network: Option<NetworkArg>,

        /// Cloud directory (overrides config)
        #[arg(long)]
        directory: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show database, preference and network status
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
