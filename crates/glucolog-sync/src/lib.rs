//! Cloud synchronization coordinator for glucose scan data.
//!
//! The [`SyncCoordinator`] runs at most one background upload or download
//! task at a time against a [`SyncBackend`]. Manual starts always proceed
//! when idle; *triggered* starts (automatic syncs after a scan or on app
//! start) are additionally gated by [`SyncCoordinator::check_if_connected`]:
//!
//! 1. the `auto_sync` preference must be enabled,
//! 2. an active network must be connected or connecting,
//! 3. on a mobile network, `auto_sync_mobile` must be enabled.
//!
//! Refused or redundant starts are silent no-ops; the reason is logged at
//! debug level.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use glucolog_store::Store;
//! use glucolog_sync::{
//!     DirectoryBackend, NetworkInfo, NetworkType, StaticConnectivity, SyncCoordinator,
//!     SyncPreferences,
//! };
//! use tokio::sync::Mutex;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(Mutex::new(Store::open_default()?));
//! let coordinator = SyncCoordinator::new(
//!     Arc::new(DirectoryBackend::new(store, "/mnt/backup/glucolog")),
//!     Arc::new(SyncPreferences::default()),
//!     Arc::new(StaticConnectivity::new(Some(NetworkInfo::connected(NetworkType::Wifi)))),
//! );
//!
//! coordinator.start_triggered_upload();
//! let status = coordinator.subscribe().wait_idle().await;
//! println!("sync finished: {:?}", status.last_outcome);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod connectivity;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod preferences;

pub use backend::{SyncBackend, SyncContext, SyncDirection};
pub use connectivity::{Connectivity, NetworkInfo, NetworkState, NetworkType, StaticConnectivity};
pub use coordinator::{
    SyncCoordinator, SyncObserver, SyncOutcome, SyncRefusal, SyncStatus, SyncSubscription,
    check_sync_gate,
};
pub use directory::DirectoryBackend;
pub use error::{Error, Result};
pub use preferences::{AUTO_SYNC, AUTO_SYNC_MOBILE, Preferences, SyncPreferences};
