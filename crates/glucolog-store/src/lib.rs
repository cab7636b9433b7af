//! Local data persistence for glucose sensor scans.
//!
//! This crate provides SQLite-based storage for [`ReadingData`] records and
//! their trend and history series.
//!
//! # Features
//!
//! - Store scans together with both glucose series
//! - Query by sensor, time range, trend presence, with pagination
//! - Atomic cascade delete of a scan and its series
//! - Change notifications and live queries that re-evaluate on every write
//! - JSON export/import
//!
//! # Example
//!
//! ```no_run
//! use glucolog_store::{Store, ReadingDataQuery};
//!
//! let store = Store::open_default()?;
//!
//! // Newest scans that carry trend data, as shown in the log
//! let records = store.query_reading_data(&ReadingDataQuery::log().limit(20))?;
//! # Ok::<(), glucolog_store::Error>(())
//! ```
//!
//! [`ReadingData`]: glucolog_types::ReadingData

mod error;
mod live;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use live::{LiveQuery, QueryState};
pub use queries::ReadingDataQuery;
pub use store::{ImportResult, Store, StoreChange};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/glucolog/data.db`
/// - macOS: `~/Library/Application Support/glucolog/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\glucolog\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("glucolog")
        .join("data.db")
}
