//! The remote side of synchronization.

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Direction of a sync task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Local store to remote.
    Upload,
    /// Remote to local store.
    Download,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Upload => write!(f, "upload"),
            SyncDirection::Download => write!(f, "download"),
        }
    }
}

/// Progress callback type.
pub type ProgressCallback = Arc<dyn Fn(f32, OffsetDateTime) + Send + Sync>;

/// Handle given to a running task for progress reports and cancellation.
#[derive(Clone)]
pub struct SyncContext {
    cancel_token: CancellationToken,
    on_progress: ProgressCallback,
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    /// Create a context from a cancellation token and a progress callback.
    pub fn new<F>(cancel_token: CancellationToken, on_progress: F) -> Self
    where
        F: Fn(f32, OffsetDateTime) + Send + Sync + 'static,
    {
        Self {
            cancel_token,
            on_progress: Arc::new(on_progress),
        }
    }

    /// Report progress as a fraction in `0.0..=1.0` together with the
    /// timestamp of the data being synchronized.
    pub fn report(&self, progress: f32, at: OffsetDateTime) {
        (self.on_progress)(progress, at);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Return [`Error::Cancelled`] if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// The token itself, for use in `tokio::select!`.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

/// A remote store the coordinator can synchronize with.
///
/// Cancellation is cooperative: implementations must poll
/// [`SyncContext::check_cancelled`] (or await the token) between units of
/// work and return [`Error::Cancelled`] when asked to stop.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Push local scans to the remote.
    async fn upload(&self, ctx: SyncContext) -> Result<()>;

    /// Pull remote scans into the local store.
    async fn download(&self, ctx: SyncContext) -> Result<()>;
}
