//! A sync backend that mirrors scans into a directory.
//!
//! Each scan is stored as `<id>.json`, which makes a synced folder (a
//! mounted cloud drive, a USB stick) usable as the remote side.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use glucolog_store::{ReadingDataQuery, Store};
use glucolog_types::ReadingData;

use crate::backend::{SyncBackend, SyncContext};
use crate::error::{Error, Result};

const RECORD_EXTENSION: &str = "json";

/// Directory-backed [`SyncBackend`].
pub struct DirectoryBackend {
    store: Arc<Mutex<Store>>,
    directory: PathBuf,
}

impl DirectoryBackend {
    pub fn new(store: Arc<Mutex<Store>>, directory: impl Into<PathBuf>) -> Self {
        Self {
            store,
            directory: directory.into(),
        }
    }

    /// The mirrored directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn record_path(&self, id: &str) -> PathBuf {
        let name: String = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{}.{}", name, RECORD_EXTENSION))
    }

    async fn record_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.directory.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl SyncBackend for DirectoryBackend {
    async fn upload(&self, ctx: SyncContext) -> Result<()> {
        let records = self
            .store
            .lock()
            .await
            .query_reading_data(&ReadingDataQuery::new().oldest_first())?;

        tokio::fs::create_dir_all(&self.directory).await?;
        info!(
            "Uploading {} scans to {}",
            records.len(),
            self.directory.display()
        );

        let total = records.len();
        for (i, record) in records.iter().enumerate() {
            ctx.check_cancelled()?;

            let path = self.record_path(&record.id);
            let tmp = path.with_extension("json.tmp");
            let json = serde_json::to_vec_pretty(record)?;
            tokio::fs::write(&tmp, json).await?;
            tokio::fs::rename(&tmp, &path).await?;

            ctx.report((i + 1) as f32 / total as f32, record.date);
        }

        if total == 0 {
            ctx.report(1.0, OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn download(&self, ctx: SyncContext) -> Result<()> {
        let files = self.record_files().await?;
        info!(
            "Downloading {} scans from {}",
            files.len(),
            self.directory.display()
        );

        let total = files.len();
        let mut imported = 0;
        let mut last_date = OffsetDateTime::now_utc();
        for (i, path) in files.iter().enumerate() {
            ctx.check_cancelled()?;
            let progress = (i + 1) as f32 / total as f32;

            let bytes = tokio::fs::read(path).await?;
            let record: ReadingData = match serde_json::from_slice(&bytes) {
                Ok(record) => record,
                Err(source) => {
                    let err = Error::InvalidRecord {
                        path: path.clone(),
                        source,
                    };
                    warn!("Skipping {}", err);
                    ctx.report(progress, last_date);
                    continue;
                }
            };

            let result = self
                .store
                .lock()
                .await
                .import_records(std::slice::from_ref(&record))?;
            imported += result.imported;

            last_date = record.date;
            ctx.report(progress, last_date);
        }

        if total == 0 {
            ctx.report(1.0, OffsetDateTime::now_utc());
        }
        info!("Downloaded {} new scans", imported);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use glucolog_types::{GlucoseReading, ReadingKind};
    use time::macros::datetime;
    use tokio_util::sync::CancellationToken;

    fn scan(age: u32, date: OffsetDateTime) -> ReadingData {
        let mut data = ReadingData::new("E007-1", age, date);
        data.trend
            .push(GlucoseReading::new("E007-1", age, date, 104.0, ReadingKind::Trend));
        data.history.push(GlucoseReading::new(
            "E007-1",
            age.saturating_sub(15),
            date,
            98.0,
            ReadingKind::History,
        ));
        data
    }

    fn store_with(records: &[ReadingData]) -> Arc<Mutex<Store>> {
        let store = Store::open_in_memory().unwrap();
        for record in records {
            store.insert_reading_data(record).unwrap();
        }
        Arc::new(Mutex::new(store))
    }

    fn recording_context(token: CancellationToken) -> (SyncContext, Arc<StdMutex<Vec<f32>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctx = SyncContext::new(token, move |p, _| sink.lock().unwrap().push(p));
        (ctx, seen)
    }

    #[tokio::test]
    async fn test_upload_then_download_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            scan(100, datetime!(2024-03-01 08:00 UTC)),
            scan(200, datetime!(2024-03-01 09:40 UTC)),
        ];

        let source = DirectoryBackend::new(store_with(&records), dir.path());
        let (ctx, progress) = recording_context(CancellationToken::new());
        source.upload(ctx).await.unwrap();

        assert_eq!(*progress.lock().unwrap(), vec![0.5, 1.0]);
        assert!(dir.path().join("E007-1_100.json").exists());
        assert!(dir.path().join("E007-1_200.json").exists());

        let target_store = store_with(&[]);
        let target = DirectoryBackend::new(Arc::clone(&target_store), dir.path());
        let (ctx, _) = recording_context(CancellationToken::new());
        target.download(ctx).await.unwrap();

        let store = target_store.lock().await;
        assert_eq!(store.get_reading_data("E007-1_100").unwrap(), Some(records[0].clone()));
        assert_eq!(store.get_reading_data("E007-1_200").unwrap(), Some(records[1].clone()));
    }

    #[tokio::test]
    async fn test_download_skips_invalid_and_existing() {
        let dir = tempfile::tempdir().unwrap();
        let existing = scan(100, datetime!(2024-03-01 08:00 UTC));
        let fresh = scan(200, datetime!(2024-03-01 09:40 UTC));

        std::fs::write(
            dir.path().join("E007-1_100.json"),
            serde_json::to_vec(&existing).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("E007-1_200.json"),
            serde_json::to_vec(&fresh).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let store = store_with(std::slice::from_ref(&existing));
        let backend = DirectoryBackend::new(Arc::clone(&store), dir.path());
        let (ctx, progress) = recording_context(CancellationToken::new());
        backend.download(ctx).await.unwrap();

        // broken.json sorts last and still completes the progress
        let progress = progress.lock().unwrap().clone();
        assert_eq!(progress.len(), 3);
        assert_eq!(progress.last(), Some(&1.0));

        let count = store
            .lock()
            .await
            .count_reading_data(&ReadingDataQuery::new())
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_download_from_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DirectoryBackend::new(store_with(&[]), dir.path().join("not-there"));
        let (ctx, progress) = recording_context(CancellationToken::new());

        backend.download(ctx).await.unwrap();
        assert_eq!(*progress.lock().unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn test_upload_observes_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![scan(100, datetime!(2024-03-01 08:00 UTC))];
        let backend = DirectoryBackend::new(store_with(&records), dir.path());

        let token = CancellationToken::new();
        token.cancel();
        let (ctx, progress) = recording_context(token);

        let result = backend.upload(ctx).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(progress.lock().unwrap().is_empty());
        assert!(!dir.path().join("E007-1_100.json").exists());
    }

    #[test]
    fn test_record_path_is_sanitized() {
        let backend = DirectoryBackend::new(store_with(&[]), "/backup");
        assert_eq!(
            backend.record_path("E0/07:1_30"),
            PathBuf::from("/backup/E0_07_1_30.json")
        );
    }
}
