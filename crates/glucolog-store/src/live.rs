//! Live queries that re-evaluate whenever the store changes.
//!
//! A [`LiveQuery`] owns a background task that subscribes to the store's
//! change notifications, re-runs its [`ReadingDataQuery`] after every
//! committed write and publishes the result through a `watch` channel.
//! Results arrive off the caller's stack; the first evaluation happens
//! asynchronously after [`LiveQuery::spawn`] returns, so subscribers first
//! observe [`QueryState::Loading`].

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use glucolog_types::ReadingData;

use crate::error::{Error, Result};
use crate::queries::ReadingDataQuery;
use crate::store::Store;

/// Current result of a live query.
#[derive(Debug, Clone, Default)]
pub enum QueryState {
    /// The first evaluation has not completed yet.
    #[default]
    Loading,
    /// Latest evaluation result.
    Ready(Arc<Vec<ReadingData>>),
    /// The latest evaluation failed.
    Failed(String),
}

impl QueryState {
    /// Records of a ready result, if any.
    pub fn records(&self) -> Option<&[ReadingData]> {
        match self {
            QueryState::Ready(records) => Some(records.as_slice()),
            _ => None,
        }
    }

    /// Whether the first evaluation is still pending.
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }
}

/// A query result set kept up to date with the store.
pub struct LiveQuery {
    state: watch::Receiver<QueryState>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl LiveQuery {
    /// Start a live query against a shared store.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(store: Arc<Mutex<Store>>, query: ReadingDataQuery) -> Self {
        let (tx, rx) = watch::channel(QueryState::Loading);
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            // Subscribe before the first evaluation so no write is missed
            let mut changes = store.lock().await.subscribe_changes();
            evaluate(&store, &query, &tx).await;

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Live query cancelled, stopping");
                        break;
                    }
                    change = changes.recv() => match change {
                        Ok(change) => {
                            debug!("Store changed ({:?}), re-evaluating", change);
                            evaluate(&store, &query, &tx).await;
                        }
                        Err(RecvError::Lagged(missed)) => {
                            debug!("Live query lagged by {} changes, re-evaluating", missed);
                            evaluate(&store, &query, &tx).await;
                        }
                        Err(RecvError::Closed) => {
                            debug!("Store closed, stopping live query");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            state: rx,
            cancel_token,
            handle,
        }
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> QueryState {
        self.state.borrow().clone()
    }

    /// Subscribe to state updates.
    ///
    /// The receiver starts out marked as seen; use `changed()` to wait for
    /// the next evaluation or `borrow()` for the current state.
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        let mut rx = self.state.clone();
        rx.borrow_and_update();
        rx
    }

    /// Wait until the query has produced a result and return it.
    pub async fn ready(&self) -> Result<Arc<Vec<ReadingData>>> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|state| !state.is_loading())
            .await
            .map_err(|_| Error::LiveQuery("live query stopped".to_string()))?
            .clone();

        match state {
            QueryState::Ready(records) => Ok(records),
            QueryState::Failed(message) => Err(Error::LiveQuery(message)),
            QueryState::Loading => Err(Error::LiveQuery("live query still loading".to_string())),
        }
    }

    /// Stop the background task.
    pub fn close(self) {
        self.cancel_token.cancel();
    }

    /// Stop the background task and wait for it to exit.
    ///
    /// Once this returns the task no longer holds its store handle.
    pub async fn stop(mut self) {
        self.cancel_token.cancel();
        if let Err(e) = (&mut self.handle).await {
            warn!("Live query task ended abnormally: {}", e);
        }
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn evaluate(
    store: &Mutex<Store>,
    query: &ReadingDataQuery,
    tx: &watch::Sender<QueryState>,
) {
    let result = store.lock().await.query_reading_data(query);
    let state = match result {
        Ok(records) => QueryState::Ready(Arc::new(records)),
        Err(e) => {
            warn!("Live query failed: {}", e);
            QueryState::Failed(e.to_string())
        }
    };
    tx.send_replace(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use glucolog_types::{GlucoseReading, ReadingKind};
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn scan(age: u32, date: OffsetDateTime, with_trend: bool) -> ReadingData {
        let mut data = ReadingData::new("E007-1", age, date);
        if with_trend {
            data.trend
                .push(GlucoseReading::new("E007-1", age, date, 110.0, ReadingKind::Trend));
        }
        data
    }

    fn ids(state: &QueryState) -> Vec<String> {
        state
            .records()
            .map(|records| records.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_initial_evaluation() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_reading_data(&scan(10, datetime!(2024-03-01 08:00 UTC), true))
            .unwrap();
        let store = Arc::new(Mutex::new(store));

        let live = LiveQuery::spawn(store, ReadingDataQuery::log());
        let records = live.ready().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "E007-1_10");
    }

    #[tokio::test]
    async fn test_updates_after_insert_and_delete() {
        let store = Arc::new(Mutex::new(Store::open_in_memory().unwrap()));
        let live = LiveQuery::spawn(Arc::clone(&store), ReadingDataQuery::log());
        assert!(live.ready().await.unwrap().is_empty());

        let mut rx = live.subscribe();
        {
            let store = store.lock().await;
            store
                .insert_reading_data(&scan(10, datetime!(2024-03-01 08:00 UTC), true))
                .unwrap();
            store
                .insert_reading_data(&scan(20, datetime!(2024-03-02 08:00 UTC), true))
                .unwrap();
            store
                .insert_reading_data(&scan(30, datetime!(2024-03-03 08:00 UTC), false))
                .unwrap();
        }

        let state = rx
            .wait_for(|s| s.records().is_some_and(|r| r.len() == 2))
            .await
            .unwrap()
            .clone();
        assert_eq!(ids(&state), vec!["E007-1_20", "E007-1_10"]);

        store.lock().await.delete_reading_data("E007-1_20").unwrap();

        let state = rx
            .wait_for(|s| s.records().is_some_and(|r| r.len() == 1))
            .await
            .unwrap()
            .clone();
        assert_eq!(ids(&state), vec!["E007-1_10"]);
    }

    #[tokio::test]
    async fn test_close_stops_task() {
        let store = Arc::new(Mutex::new(Store::open_in_memory().unwrap()));
        let live = LiveQuery::spawn(store, ReadingDataQuery::new());
        live.ready().await.unwrap();

        let mut rx = live.subscribe();
        live.close();

        // Sender is dropped when the task exits
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_releases_store() {
        let store = Arc::new(Mutex::new(Store::open_in_memory().unwrap()));
        let live = LiveQuery::spawn(Arc::clone(&store), ReadingDataQuery::log());
        live.ready().await.unwrap();

        live.stop().await;
        assert_eq!(Arc::strong_count(&store), 1);
    }
}
