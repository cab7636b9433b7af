//! Synchronization coordinator.
//!
//! [`SyncCoordinator`] is a cheaply cloneable handle to one shared
//! coordinator. Its state lives behind a single mutex; observer callbacks and
//! subscription updates are delivered outside of that lock, serialized by a
//! second delivery lock so that every observer sees updates in order.
//!
//! Observer callbacks must not register or unregister observers or start
//! tasks themselves.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{SyncBackend, SyncContext, SyncDirection};
use crate::connectivity::Connectivity;
use crate::error::Error;
use crate::preferences::{
    AUTO_SYNC, AUTO_SYNC_DEFAULT, AUTO_SYNC_MOBILE, AUTO_SYNC_MOBILE_DEFAULT, Preferences,
};

/// Receives progress of the running sync task.
pub trait SyncObserver: Send + Sync {
    /// Progress fraction and the timestamp of the data being synchronized.
    fn update_progress(&self, progress: f32, at: OffsetDateTime);

    /// The task ended (completed, cancelled or failed).
    fn finished(&self);
}

/// How the last sync task ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// Snapshot of the coordinator state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    /// Progress of the current (or last) task, `0.0..=1.0`.
    pub progress: f32,
    /// Timestamp reported with the latest progress update.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Whether a task is in flight.
    pub running: bool,
    /// Direction of the task in flight.
    pub direction: Option<SyncDirection>,
    /// Outcome of the last finished task.
    pub last_outcome: Option<SyncOutcome>,
}

impl SyncStatus {
    fn idle() -> Self {
        Self {
            progress: 0.0,
            updated_at: OffsetDateTime::now_utc(),
            running: false,
            direction: None,
            last_outcome: None,
        }
    }
}

/// Why a triggered sync was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRefusal {
    /// The `auto_sync` preference is off.
    AutoSyncDisabled,
    /// No active network, or it is not connected or connecting.
    NotConnected,
    /// The active network is mobile and `auto_sync_mobile` is off.
    MobileSyncDisabled,
}

impl fmt::Display for SyncRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncRefusal::AutoSyncDisabled => write!(f, "auto sync is disabled"),
            SyncRefusal::NotConnected => write!(f, "not connected"),
            SyncRefusal::MobileSyncDisabled => {
                write!(f, "mobile connection and auto sync mobile is disabled")
            }
        }
    }
}

/// The triggered-sync policy, evaluated in order:
///
/// 1. `auto_sync` must be enabled,
/// 2. an active network must be connected or connecting,
/// 3. on a mobile network, `auto_sync_mobile` must be enabled.
pub fn check_sync_gate(
    preferences: &dyn Preferences,
    connectivity: &dyn Connectivity,
) -> Result<(), SyncRefusal> {
    if !preferences.get_bool(AUTO_SYNC, AUTO_SYNC_DEFAULT) {
        return Err(SyncRefusal::AutoSyncDisabled);
    }

    let network = match connectivity.active_network() {
        Some(network) if network.is_connected_or_connecting() => network,
        _ => return Err(SyncRefusal::NotConnected),
    };

    if network.is_mobile() && !preferences.get_bool(AUTO_SYNC_MOBILE, AUTO_SYNC_MOBILE_DEFAULT) {
        return Err(SyncRefusal::MobileSyncDisabled);
    }

    Ok(())
}

/// A subscription to coordinator status updates.
///
/// Intermediate updates may be coalesced; a subscriber always observes the
/// latest status. Dropping the subscription (or calling
/// [`unsubscribe`](Self::unsubscribe)) ends it.
pub struct SyncSubscription {
    rx: watch::Receiver<SyncStatus>,
}

impl SyncSubscription {
    /// Current status.
    pub fn current(&self) -> SyncStatus {
        self.rx.borrow().clone()
    }

    /// Wait for the next update. Returns `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<SyncStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until no task is running and return that status.
    pub async fn wait_idle(&mut self) -> SyncStatus {
        let idle = self.rx.wait_for(|s| !s.running).await.map(|s| s.clone());
        idle.unwrap_or_else(|_| self.rx.borrow().clone())
    }

    /// End the subscription.
    pub fn unsubscribe(self) {}
}

struct ActiveTask {
    id: u64,
    cancel_token: CancellationToken,
}

struct State {
    status: SyncStatus,
    active: Option<ActiveTask>,
    observer: Option<Arc<dyn SyncObserver>>,
    next_task_id: u64,
}

impl State {
    fn is_active(&self, task_id: u64) -> bool {
        self.active.as_ref().is_some_and(|t| t.id == task_id)
    }
}

struct Shared {
    state: Mutex<State>,
    /// Serializes observer and subscriber delivery. Taken before `state`.
    delivery: Mutex<()>,
    status_tx: watch::Sender<SyncStatus>,
    backend: Arc<dyn SyncBackend>,
    preferences: Arc<dyn Preferences>,
    connectivity: Arc<dyn Connectivity>,
    runtime: Handle,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_progress(&self, task_id: u64, progress: f32, at: OffsetDateTime) {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };

        let _delivery = self.lock_delivery();
        let (status, observer) = {
            let mut state = self.lock();
            if !state.is_active(task_id) {
                debug!("Ignoring progress from stale sync task {}", task_id);
                return;
            }
            state.status.progress = progress;
            state.status.updated_at = at;
            (state.status.clone(), state.observer.clone())
        };

        if let Some(observer) = observer {
            observer.update_progress(progress, at);
        }
        self.status_tx.send_replace(status);
    }

    fn finish(&self, task_id: u64, outcome: SyncOutcome) {
        let _delivery = self.lock_delivery();
        let (status, observer) = {
            let mut state = self.lock();
            if !state.is_active(task_id) {
                return;
            }
            state.active = None;
            state.status.running = false;
            state.status.direction = None;
            state.status.last_outcome = Some(outcome);
            (state.status.clone(), state.observer.clone())
        };

        if let Some(observer) = observer {
            observer.finished();
        }
        self.status_tx.send_replace(status);
        debug!("Sync task {} completed", task_id);
    }
}

async fn run_task(shared: Arc<Shared>, task_id: u64, direction: SyncDirection, ctx: SyncContext) {
    let backend = Arc::clone(&shared.backend);
    let work = tokio::spawn(async move {
        match direction {
            SyncDirection::Upload => backend.upload(ctx).await,
            SyncDirection::Download => backend.download(ctx).await,
        }
    });

    let outcome = match work.await {
        Ok(Ok(())) => {
            info!("Sync {} completed", direction);
            SyncOutcome::Completed
        }
        Ok(Err(Error::Cancelled)) => {
            info!("Sync {} cancelled", direction);
            SyncOutcome::Cancelled
        }
        Ok(Err(e)) => {
            warn!("Sync {} failed: {}", direction, e);
            SyncOutcome::Failed(e.to_string())
        }
        Err(e) => {
            warn!("Sync {} task aborted: {}", direction, e);
            SyncOutcome::Failed(format!("task aborted: {}", e))
        }
    };

    shared.finish(task_id, outcome);
}

/// Coordinates background upload and download tasks.
///
/// At most one task runs at a time. Start requests while a task is in flight
/// are ignored, as are triggered starts refused by
/// [`check_if_connected`](Self::check_if_connected); neither is reported to
/// the caller.
#[derive(Clone)]
pub struct SyncCoordinator {
    shared: Arc<Shared>,
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl SyncCoordinator {
    /// Create a coordinator that spawns its tasks on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime; use
    /// [`with_runtime`](Self::with_runtime) there.
    pub fn new(
        backend: Arc<dyn SyncBackend>,
        preferences: Arc<dyn Preferences>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self::with_runtime(backend, preferences, connectivity, Handle::current())
    }

    /// Create a coordinator that spawns its tasks on `runtime`.
    pub fn with_runtime(
        backend: Arc<dyn SyncBackend>,
        preferences: Arc<dyn Preferences>,
        connectivity: Arc<dyn Connectivity>,
        runtime: Handle,
    ) -> Self {
        let status = SyncStatus::idle();
        let (status_tx, _) = watch::channel(status.clone());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    status,
                    active: None,
                    observer: None,
                    next_task_id: 1,
                }),
                delivery: Mutex::new(()),
                status_tx,
                backend,
                preferences,
                connectivity,
                runtime,
            }),
        }
    }

    /// Replace the observer and immediately deliver the current progress to it.
    pub fn register_observer(&self, observer: Arc<dyn SyncObserver>) {
        let _delivery = self.shared.lock_delivery();
        let (progress, at) = {
            let mut state = self.shared.lock();
            state.observer = Some(Arc::clone(&observer));
            (state.status.progress, state.status.updated_at)
        };
        observer.update_progress(progress, at);
    }

    /// Drop the observer.
    pub fn unregister_observer(&self) {
        let _delivery = self.shared.lock_delivery();
        self.shared.lock().observer = None;
    }

    /// Subscribe to status updates.
    pub fn subscribe(&self) -> SyncSubscription {
        SyncSubscription {
            rx: self.shared.status_tx.subscribe(),
        }
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        self.shared.lock().status.clone()
    }

    /// Whether a task is in flight.
    pub fn is_running(&self) -> bool {
        self.shared.lock().status.running
    }

    /// Request cooperative cancellation of the running task.
    ///
    /// The task keeps counting as running until it observes the request and
    /// returns. No-op when idle.
    pub fn cancel(&self) {
        let state = self.shared.lock();
        if let Some(task) = &state.active {
            debug!("Requesting cancellation of sync task {}", task.id);
            task.cancel_token.cancel();
        }
    }

    /// Start an upload unless a task is already running.
    pub fn start_upload(&self) {
        self.start(SyncDirection::Upload);
    }

    /// Start a download unless a task is already running.
    pub fn start_download(&self) {
        self.start(SyncDirection::Download);
    }

    /// Start an upload if [`check_if_connected`](Self::check_if_connected) allows it.
    pub fn start_triggered_upload(&self) {
        if !self.check_if_connected() {
            return;
        }
        self.start_upload();
    }

    /// Start a download if [`check_if_connected`](Self::check_if_connected) allows it.
    pub fn start_triggered_download(&self) {
        if !self.check_if_connected() {
            return;
        }
        self.start_download();
    }

    /// Whether preferences and the active network allow a triggered sync.
    pub fn check_if_connected(&self) -> bool {
        match self.gate() {
            Ok(()) => true,
            Err(reason) => {
                debug!("Not syncing: {}", reason);
                false
            }
        }
    }

    /// Like [`check_if_connected`](Self::check_if_connected), with the reason for a refusal.
    pub fn gate(&self) -> Result<(), SyncRefusal> {
        check_sync_gate(
            self.shared.preferences.as_ref(),
            self.shared.connectivity.as_ref(),
        )
    }

    fn start(&self, direction: SyncDirection) {
        let _delivery = self.shared.lock_delivery();
        let mut state = self.shared.lock();
        if state.active.is_some() {
            debug!("Sync task already running, ignoring {} request", direction);
            return;
        }

        let task_id = state.next_task_id;
        state.next_task_id += 1;
        debug!("Starting new {} task {}", direction, task_id);

        let cancel_token = CancellationToken::new();
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let ctx = SyncContext::new(cancel_token.clone(), move |progress, at| {
            if let Some(shared) = weak.upgrade() {
                shared.update_progress(task_id, progress, at);
            }
        });

        state.status.running = true;
        state.status.direction = Some(direction);
        state.active = Some(ActiveTask {
            id: task_id,
            cancel_token,
        });

        // Running is published before the task exists, so its finish() always lands last
        self.shared.status_tx.send_replace(state.status.clone());
        self.shared.runtime.spawn(run_task(
            Arc::clone(&self.shared),
            task_id,
            direction,
            ctx,
        ));
    }
}
