//! Main store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::broadcast;
use tracing::{debug, info};

use glucolog_types::{GlucoseReading, ReadingData, ReadingKind};

use crate::error::{Error, Result};
use crate::queries::ReadingDataQuery;
use crate::schema;

/// Capacity of the change notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A committed modification of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A scan was inserted or replaced.
    Inserted { id: String },
    /// A scan and both of its series were deleted.
    Deleted { id: String },
    /// A batch of scans was imported.
    Imported { count: usize },
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// Scans written to the store.
    pub imported: usize,
    /// Scans skipped because their id was already present.
    pub skipped: usize,
}

/// SQLite-based store for glucose scans.
pub struct Store {
    conn: Connection,
    changes: broadcast::Sender<StoreChange>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self::with_connection(conn))
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { conn, changes }
    }

    /// Close the database, reporting any error from SQLite.
    ///
    /// Dropping the store also closes it, silently.
    pub fn close(self) -> Result<()> {
        debug!("Closing database");
        self.conn.close().map_err(|(_, e)| Error::Database(e))
    }

    /// Subscribe to committed changes.
    ///
    /// Notifications are sent after the corresponding transaction commits.
    /// Slow receivers may observe `RecvError::Lagged` and should then
    /// re-read whatever they display.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: StoreChange) {
        // Ignore error if no receivers
        let _ = self.changes.send(change);
    }
}

/// Raw `reading_data` row before timestamp conversion.
struct ScanRow {
    id: String,
    sensor_id: String,
    sensor_age_minutes: i64,
    date: i64,
    timezone_offset_minutes: i32,
}

fn offset_from_minutes(minutes: i32) -> Result<UtcOffset> {
    UtcOffset::from_whole_seconds(minutes.saturating_mul(60))
        .map_err(|e| Error::InvalidTimestamp(format!("offset {} minutes: {}", minutes, e)))
}

fn datetime_from_unix(nanos: i64, offset: UtcOffset) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .map(|dt| dt.to_offset(offset))
        .map_err(|e| Error::InvalidTimestamp(format!("{}: {}", nanos, e)))
}

/// Stored form of a date: Unix nanoseconds.
fn unix_nanos(date: OffsetDateTime) -> Result<i64> {
    i64::try_from(date.unix_timestamp_nanos())
        .map_err(|_| Error::InvalidTimestamp(format!("{} is out of range", date)))
}

/// Unix nanoseconds for a range bound, saturating outside the stored range.
pub(crate) fn unix_nanos_saturating(date: OffsetDateTime) -> i64 {
    let nanos = date.unix_timestamp_nanos();
    i64::try_from(nanos).unwrap_or(if nanos < 0 { i64::MIN } else { i64::MAX })
}

fn scan_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM reading_data WHERE id = ?",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Write a scan and both series, replacing any previous version.
///
/// Must be called inside a transaction.
fn write_reading_data(conn: &Connection, data: &ReadingData) -> Result<()> {
    conn.execute(
        "DELETE FROM glucose_readings WHERE reading_data_id = ?1",
        [&data.id],
    )?;

    conn.execute(
        "INSERT INTO reading_data (id, sensor_id, sensor_age_minutes, date, timezone_offset_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            sensor_id = ?2,
            sensor_age_minutes = ?3,
            date = ?4,
            timezone_offset_minutes = ?5",
        rusqlite::params![
            data.id,
            data.sensor_id,
            data.sensor_age_minutes,
            unix_nanos(data.date)?,
            data.timezone_offset_minutes,
        ],
    )?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO glucose_readings (reading_data_id, kind, sensor_id,
         sensor_time_minutes, date, glucose_mg_dl)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    // The series a reading sits in decides its kind, not its own label
    let series = data
        .trend
        .iter()
        .map(|r| (ReadingKind::Trend, r))
        .chain(data.history.iter().map(|r| (ReadingKind::History, r)));
    for (kind, reading) in series {
        stmt.execute(rusqlite::params![
            data.id,
            kind.as_str(),
            reading.sensor_id,
            reading.sensor_time_minutes,
            unix_nanos(reading.date)?,
            reading.glucose_mg_dl,
        ])?;
    }

    Ok(())
}

// Scan operations
impl Store {
    /// Insert a scan with its trend and history, replacing any scan with the same id.
    pub fn insert_reading_data(&self, data: &ReadingData) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_reading_data(&tx, data)?;
        tx.commit()?;

        debug!(
            "Stored scan {} ({} trend, {} history)",
            data.id,
            data.trend.len(),
            data.history.len()
        );
        self.notify(StoreChange::Inserted {
            id: data.id.clone(),
        });
        Ok(())
    }

    /// Get a scan by id.
    pub fn get_reading_data(&self, id: &str) -> Result<Option<ReadingData>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, sensor_id, sensor_age_minutes, date, timezone_offset_minutes
                 FROM reading_data WHERE id = ?",
                [id],
                |row| {
                    Ok(ScanRow {
                        id: row.get(0)?,
                        sensor_id: row.get(1)?,
                        sensor_age_minutes: row.get(2)?,
                        date: row.get(3)?,
                        timezone_offset_minutes: row.get(4)?,
                    })
                },
            )
            .optional()?;

        row.map(|r| self.assemble(r)).transpose()
    }

    /// Query scans with filters.
    pub fn query_reading_data(&self, query: &ReadingDataQuery) -> Result<Vec<ReadingData>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(ScanRow {
                    id: row.get(0)?,
                    sensor_id: row.get(1)?,
                    sensor_age_minutes: row.get(2)?,
                    date: row.get(3)?,
                    timezone_offset_minutes: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(|r| self.assemble(r)).collect()
    }

    /// Count scans matching a query (limit and offset are ignored).
    pub fn count_reading_data(&self, query: &ReadingDataQuery) -> Result<u64> {
        let sql = query.build_count_sql();
        let (_, params) = query.build_where();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = self
            .conn
            .query_row(&sql, params_ref.as_slice(), |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete a scan together with its history and trend series.
    ///
    /// The three deletions run in one transaction: either all of them are
    /// committed or none is. Returns `false` if no scan has this id.
    pub fn delete_reading_data(&self, id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;

        if !scan_exists(&tx, id)? {
            debug!("Scan {} not found, nothing to delete", id);
            return Ok(false);
        }

        let history = tx.execute(
            "DELETE FROM glucose_readings WHERE reading_data_id = ?1 AND kind = 'history'",
            [id],
        )?;
        let trend = tx.execute(
            "DELETE FROM glucose_readings WHERE reading_data_id = ?1 AND kind = 'trend'",
            [id],
        )?;
        tx.execute("DELETE FROM reading_data WHERE id = ?1", [id])?;
        tx.commit()?;

        info!(
            "Deleted scan {} ({} history, {} trend readings)",
            id, history, trend
        );
        self.notify(StoreChange::Deleted { id: id.to_string() });
        Ok(true)
    }

    fn assemble(&self, row: ScanRow) -> Result<ReadingData> {
        let offset = offset_from_minutes(row.timezone_offset_minutes)?;
        let (trend, history) = self.load_series(&row.id, offset)?;

        Ok(ReadingData {
            id: row.id,
            sensor_id: row.sensor_id,
            sensor_age_minutes: row.sensor_age_minutes as u32,
            date: datetime_from_unix(row.date, offset)?,
            timezone_offset_minutes: row.timezone_offset_minutes,
            trend,
            history,
        })
    }

    fn load_series(
        &self,
        id: &str,
        offset: UtcOffset,
    ) -> Result<(Vec<GlucoseReading>, Vec<GlucoseReading>)> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT kind, sensor_id, sensor_time_minutes, date, glucose_mg_dl
             FROM glucose_readings WHERE reading_data_id = ?
             ORDER BY sensor_time_minutes ASC, id ASC",
        )?;

        let rows = stmt
            .query_map([id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut trend = Vec::new();
        let mut history = Vec::new();
        for (kind, sensor_id, sensor_time, date, glucose) in rows {
            let kind: ReadingKind = kind.parse()?;
            let reading = GlucoseReading {
                sensor_id,
                sensor_time_minutes: sensor_time as u32,
                date: datetime_from_unix(date, offset)?,
                glucose_mg_dl: glucose as f32,
                kind,
            };
            match kind {
                ReadingKind::Trend => trend.push(reading),
                ReadingKind::History => history.push(reading),
            }
        }

        Ok((trend, history))
    }
}

// Export and import
impl Store {
    /// Export every scan as pretty-printed JSON, oldest first.
    pub fn export_json(&self) -> Result<String> {
        let records = self.query_reading_data(&ReadingDataQuery::new().oldest_first())?;
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Import scans from a JSON array, skipping ids already present.
    pub fn import_json(&self, json: &str) -> Result<ImportResult> {
        let records: Vec<ReadingData> = serde_json::from_str(json)?;
        self.import_records(&records)
    }

    /// Import scans in one transaction, skipping ids already present.
    pub fn import_records(&self, records: &[ReadingData]) -> Result<ImportResult> {
        let tx = self.conn.unchecked_transaction()?;
        let mut result = ImportResult::default();

        for data in records {
            if scan_exists(&tx, &data.id)? {
                result.skipped += 1;
                continue;
            }
            write_reading_data(&tx, data)?;
            result.imported += 1;
        }

        tx.commit()?;

        info!(
            "Imported {} scans ({} already present)",
            result.imported, result.skipped
        );
        if result.imported > 0 {
            self.notify(StoreChange::Imported {
                count: result.imported,
            });
        }
        Ok(result)
    }
}
