//! Configuration file management.

use std::path::{Path, PathBuf};

use glucolog_sync::{NetworkInfo, NetworkState, NetworkType, SyncPreferences};
use glucolog_types::GlucoseUnit;
use serde::{Deserialize, Serialize};

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local database.
    pub storage: StorageConfig,
    /// Sync preferences (`auto_sync`, `auto_sync_mobile`).
    pub sync: SyncPreferences,
    /// The network the CLI reports as active.
    pub network: NetworkConfig,
    /// Remote side of `glucolog sync`.
    pub cloud: CloudConfig,
    /// Output settings.
    pub display: DisplayConfig,
}

impl Config {
    /// Load configuration from the default path, or defaults when it does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Storage path is not empty
    /// - Cloud directory is not empty and is not the database file itself
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.storage.validate());
        errors.extend(self.cloud.validate());

        if !self.cloud.directory.as_os_str().is_empty() && self.cloud.directory == self.storage.path
        {
            errors.push(ValidationError {
                field: "cloud.directory".to_string(),
                message: "cloud directory cannot be the database file".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: glucolog_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }
        errors
    }
}

/// Active network as seen by the CLI.
///
/// A desktop has no portable connectivity service, so the network is
/// declared here (or overridden per invocation with `--network`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network type.
    pub kind: NetworkType,
    /// Whether that network is connected.
    pub connected: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            kind: NetworkType::Wifi,
            connected: true,
        }
    }
}

impl NetworkConfig {
    /// The configured active network.
    pub fn active_network(&self) -> NetworkInfo {
        NetworkInfo {
            network_type: self.kind,
            state: if self.connected {
                NetworkState::Connected
            } else {
                NetworkState::Disconnected
            },
        }
    }
}

/// Cloud (sync target) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Directory that scans are mirrored to.
    pub directory: PathBuf,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            directory: default_cloud_dir(),
        }
    }
}

impl CloudConfig {
    /// Validate cloud configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.directory.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "cloud.directory".to_string(),
                message: "cloud directory cannot be empty".to_string(),
            });
        }
        errors
    }
}

/// Display configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Glucose unit (`mgdl` or `mmoll`).
    pub unit: GlucoseUnit,
    /// Disable colored output.
    pub no_color: bool,
}

/// A validation error for a specific field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glucolog")
        .join("config.toml")
}

/// Default cloud directory.
pub fn default_cloud_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glucolog")
        .join("cloud")
}
