//! The scan log: a live, newest-first list of scans with a trend series.
//!
//! A [`LogView`] owns its store handle for as long as it is open. The list is
//! populated asynchronously: right after [`LogView::open`] the state is
//! [`QueryState::Loading`], then every committed store change produces a new
//! [`QueryState::Ready`] snapshot.

use std::path::Path;
use std::sync::Arc;

use glucolog_store::{LiveQuery, QueryState, ReadingDataQuery, Result, Store};
use glucolog_types::ReadingData;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

/// Receives the scan the user selected in the log.
pub trait ScanDataListener: Send + Sync {
    fn on_show_scan_data(&self, data: &ReadingData);
}

/// Live view over the scan log.
pub struct LogView {
    store: Arc<Mutex<Store>>,
    live: LiveQuery,
    listener: Arc<dyn ScanDataListener>,
}

impl LogView {
    /// Open the database at `path` and start the live log query.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(path: impl AsRef<Path>, listener: Arc<dyn ScanDataListener>) -> Result<Self> {
        let store = Store::open(path)?;
        Ok(Self::with_store(store, listener))
    }

    /// Start the view over an already opened store, taking ownership of it.
    pub fn with_store(store: Store, listener: Arc<dyn ScanDataListener>) -> Self {
        let store = Arc::new(Mutex::new(store));
        let live = LiveQuery::spawn(Arc::clone(&store), ReadingDataQuery::log());
        Self {
            store,
            live,
            listener,
        }
    }

    /// Current list state.
    pub fn state(&self) -> QueryState {
        self.live.current()
    }

    /// Subscribe to list updates.
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.live.subscribe()
    }

    /// Wait for the list to be populated and return it.
    pub async fn records(&self) -> Result<Arc<Vec<ReadingData>>> {
        self.live.ready().await
    }

    /// Pull-to-refresh. Does not sync; returns as soon as the refresh
    /// indicator can be cleared.
    pub async fn refresh(&self) {
        debug!("Refresh requested, nothing to do");
    }

    /// Hand the scan `id` to the listener. Returns `false` if it does not exist.
    pub async fn show(&self, id: &str) -> Result<bool> {
        let data = self.store.lock().await.get_reading_data(id)?;
        match data {
            Some(data) => {
                self.listener.on_show_scan_data(&data);
                Ok(true)
            }
            None => {
                debug!("Cannot show {}: no such scan", id);
                Ok(false)
            }
        }
    }

    /// Delete the scan `id` with both of its series.
    ///
    /// The delete is all-or-nothing. Returns `false` if the scan does not exist.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.store.lock().await.delete_reading_data(id)?;
        if deleted {
            info!("Deleted scan {}", id);
        }
        Ok(deleted)
    }

    /// Stop the live query and close the store.
    pub async fn close(self) -> Result<()> {
        self.live.stop().await;
        match Arc::try_unwrap(self.store) {
            Ok(store) => store.into_inner().close(),
            Err(_) => {
                debug!("Store still shared, it closes with its last handle");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use glucolog_types::{GlucoseReading, ReadingKind};
    use time::OffsetDateTime;
    use time::macros::datetime;

    #[derive(Default)]
    struct Recorder {
        shown: StdMutex<Vec<String>>,
    }

    impl ScanDataListener for Recorder {
        fn on_show_scan_data(&self, data: &ReadingData) {
            self.shown.lock().unwrap().push(data.id.clone());
        }
    }

    fn scan(age: u32, date: OffsetDateTime, with_trend: bool) -> ReadingData {
        let mut data = ReadingData::new("E007-5", age, date);
        if with_trend {
            data.trend
                .push(GlucoseReading::new("E007-5", age, date, 131.0, ReadingKind::Trend));
        }
        data.history.push(GlucoseReading::new(
            "E007-5",
            age.saturating_sub(15),
            date,
            125.0,
            ReadingKind::History,
        ));
        data
    }

    fn view_with(records: &[ReadingData]) -> (LogView, Arc<Recorder>) {
        let store = Store::open_in_memory().unwrap();
        for record in records {
            store.insert_reading_data(record).unwrap();
        }
        let recorder = Arc::new(Recorder::default());
        let view = LogView::with_store(store, recorder.clone());
        (view, recorder)
    }

    fn ids(records: &[ReadingData]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_starts_loading_then_ready() {
        let (view, _) = view_with(&[scan(10, datetime!(2024-03-01 08:00 UTC), true)]);

        // The first evaluation runs on the spawned task, after open returns
        assert!(view.state().is_loading());

        let records = view.records().await.unwrap();
        assert_eq!(ids(&records), vec!["E007-5_10"]);
    }

    #[tokio::test]
    async fn test_lists_newest_first_with_trend_only() {
        let (view, _) = view_with(&[
            scan(10, datetime!(2024-03-01 08:00 UTC), true),
            scan(20, datetime!(2024-03-03 08:00 UTC), true),
            scan(30, datetime!(2024-03-04 08:00 UTC), false),
            scan(40, datetime!(2024-03-02 08:00 UTC), true),
        ]);

        let records = view.records().await.unwrap();
        assert_eq!(ids(&records), vec!["E007-5_20", "E007-5_40", "E007-5_10"]);
    }

    #[tokio::test]
    async fn test_delete_updates_list() {
        let (view, _) = view_with(&[
            scan(10, datetime!(2024-03-01 08:00 UTC), true),
            scan(20, datetime!(2024-03-02 08:00 UTC), true),
        ]);
        assert_eq!(view.records().await.unwrap().len(), 2);

        let mut rx = view.subscribe();
        assert!(view.delete("E007-5_20").await.unwrap());

        let state = rx
            .wait_for(|s| s.records().is_some_and(|r| r.len() == 1))
            .await
            .unwrap()
            .clone();
        assert_eq!(ids(state.records().unwrap()), vec!["E007-5_10"]);

        assert!(!view.delete("E007-5_20").await.unwrap());
    }

    #[tokio::test]
    async fn test_show_forwards_to_listener() {
        let (view, recorder) = view_with(&[scan(10, datetime!(2024-03-01 08:00 UTC), true)]);

        assert!(view.show("E007-5_10").await.unwrap());
        assert!(!view.show("E007-5_99").await.unwrap());

        assert_eq!(*recorder.shown.lock().unwrap(), vec!["E007-5_10".to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_leaves_list_unchanged() {
        let (view, _) = view_with(&[scan(10, datetime!(2024-03-01 08:00 UTC), true)]);
        let before = view.records().await.unwrap();

        view.refresh().await;

        assert_eq!(view.records().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_open_and_close_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.db");
        let recorder = Arc::new(Recorder::default());

        let view = LogView::open(&path, recorder.clone()).unwrap();
        assert!(view.records().await.unwrap().is_empty());
        view.close().await.unwrap();

        // The database file can be reopened once the view has released it
        let store = Store::open(&path).unwrap();
        assert_eq!(store.count_reading_data(&ReadingDataQuery::new()).unwrap(), 0);
    }
}
