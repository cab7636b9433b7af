//! Database schema and migrations.

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
///
/// `glucose_readings` references its scan without `ON DELETE CASCADE`; the
/// store removes both series explicitly inside the delete transaction.
/// Dates are Unix timestamps in nanoseconds.
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- One row per sensor scan
        CREATE TABLE IF NOT EXISTS reading_data (
            id TEXT PRIMARY KEY,
            sensor_id TEXT NOT NULL,
            sensor_age_minutes INTEGER NOT NULL,
            date INTEGER NOT NULL,
            timezone_offset_minutes INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_reading_data_date
            ON reading_data(date);

        -- Trend and history values of each scan
        CREATE TABLE IF NOT EXISTS glucose_readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reading_data_id TEXT NOT NULL REFERENCES reading_data(id),
            kind TEXT NOT NULL CHECK (kind IN ('trend', 'history')),
            sensor_id TEXT NOT NULL,
            sensor_time_minutes INTEGER NOT NULL,
            date INTEGER NOT NULL,
            glucose_mg_dl REAL NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_glucose_readings_parent
            ON glucose_readings(reading_data_id, kind);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"reading_data".to_string()));
        assert!(tables.contains(&"glucose_readings".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_schema_version_tracking() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), 0);

        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        // Re-initializing an up-to-date database is a no-op
        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_kind_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        initialize(&conn).unwrap();

        conn.execute(
            "INSERT INTO reading_data (id, sensor_id, sensor_age_minutes, date) VALUES ('a_1', 'a', 1, 0)",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO glucose_readings (reading_data_id, kind, sensor_id, sensor_time_minutes, date, glucose_mg_dl)
             VALUES ('a_1', 'raw', 'a', 1, 0, 100.0)",
            [],
        );
        assert!(result.is_err());
    }
}
