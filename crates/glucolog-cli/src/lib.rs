//! Command-line glucose scan log with cloud sync.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `log` | List scans with a trend series, newest first |
//! | `show` | Show one scan with both series |
//! | `delete` | Delete a scan and its readings |
//! | `import` | Import scans from a JSON export |
//! | `export` | Export every scan as JSON |
//! | `sync` | Upload to or download from the cloud directory |
//! | `status` | Database, sync preference and network summary |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! The CLI reads `~/.config/glucolog/config.toml` (or platform equivalent):
//!
//! ```toml
//! [storage]
//! path = "/home/me/.local/share/glucolog/data.db"
//!
//! [sync]
//! auto_sync = true
//! auto_sync_mobile = false
//!
//! [network]
//! kind = "wifi"
//! connected = true
//!
//! [cloud]
//! directory = "/mnt/nextcloud/glucolog"
//!
//! [display]
//! unit = "mmoll"
//! ```
//!
//! # Environment Variables
//!
//! - `GLUCOLOG_CONFIG`: configuration file (overridden by `--config`)
//! - `GLUCOLOG_DB`: database file (overridden by `--database`)
//! - `NO_COLOR`: disable colored output when set

pub mod config;
pub mod format;
pub mod log_view;

// Re-export core crates for convenience
pub use glucolog_store;
pub use glucolog_sync;
pub use glucolog_types;
