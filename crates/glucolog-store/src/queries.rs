//! Query builder for stored scans.
//!
//! [`ReadingDataQuery`] follows the builder pattern for filtering and
//! paginating [`ReadingData`](glucolog_types::ReadingData) records.
//!
//! # Example
//!
//! ```
//! use glucolog_store::{Store, ReadingDataQuery};
//! use time::{OffsetDateTime, Duration};
//!
//! let store = Store::open_in_memory()?;
//! let yesterday = OffsetDateTime::now_utc() - Duration::hours(24);
//!
//! let query = ReadingDataQuery::new()
//!     .sensor("E007-0000ABCD")
//!     .since(yesterday)
//!     .with_trend()
//!     .limit(50);
//!
//! let records = store.query_reading_data(&query)?;
//! # Ok::<(), glucolog_store::Error>(())
//! ```

use time::OffsetDateTime;

use crate::store::unix_nanos_saturating;

/// Fluent query builder for scans.
///
/// Use this to construct queries for
/// [`Store::query_reading_data`](crate::Store::query_reading_data).
/// All filter methods are optional and can be chained in any order.
///
/// By default, queries return results ordered by scan date descending
/// (newest first).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadingDataQuery {
    /// Filter by sensor serial.
    pub sensor_id: Option<String>,
    /// Include only scans at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Include only scans at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Include only scans with at least one trend value.
    pub require_trend: bool,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by date descending (newest first).
    pub newest_first: bool,
}

impl ReadingDataQuery {
    /// Create a new query with default settings.
    ///
    /// Default behavior:
    /// - No sensor filter
    /// - No time range filter
    /// - Scans with and without trend values
    /// - No limit
    /// - Ordered by newest first
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// The query backing the scan log: scans with trend values, newest first.
    pub fn log() -> Self {
        Self::new().with_trend()
    }

    /// Filter by sensor serial.
    pub fn sensor(mut self, sensor_id: &str) -> Self {
        self.sensor_id = Some(sensor_id.to_string());
        self
    }

    /// Filter to scans taken at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to scans taken at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Only return scans whose trend series is not empty.
    pub fn with_trend(mut self) -> Self {
        self.require_trend = true;
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref sensor_id) = self.sensor_id {
            conditions.push("d.sensor_id = ?");
            params.push(Box::new(sensor_id.clone()));
        }

        if let Some(since) = self.since {
            conditions.push("d.date >= ?");
            params.push(Box::new(unix_nanos_saturating(since)));
        }

        if let Some(until) = self.until {
            conditions.push("d.date <= ?");
            params.push(Box::new(unix_nanos_saturating(until)));
        }

        if self.require_trend {
            conditions.push(
                "EXISTS (SELECT 1 FROM glucose_readings g \
                 WHERE g.reading_data_id = d.id AND g.kind = 'trend')",
            );
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the SQL selecting matching scan rows.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT d.id, d.sensor_id, d.sensor_age_minutes, d.date, d.timezone_offset_minutes \
             FROM reading_data d {} ORDER BY d.date {}, d.id {}",
            where_clause, order, order
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        } else if self.offset.is_some() {
            // SQLite requires a LIMIT before OFFSET
            sql.push_str(" LIMIT -1");
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    /// Build the SQL counting matching scans.
    pub(crate) fn build_count_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        format!("SELECT COUNT(*) FROM reading_data d {}", where_clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query() {
        let query = ReadingDataQuery::new();
        assert!(query.newest_first);
        assert!(!query.require_trend);

        let sql = query.build_sql();
        assert!(!sql.contains("WHERE"));
        assert!(sql.contains("ORDER BY d.date DESC"));
    }

    #[test]
    fn test_log_query_filters_trend() {
        let sql = ReadingDataQuery::log().build_sql();
        assert!(sql.contains("g.kind = 'trend'"));
        assert!(sql.contains("DESC"));
    }

    #[test]
    fn test_filters_and_params() {
        let now = OffsetDateTime::now_utc();
        let query = ReadingDataQuery::new()
            .sensor("E007-1")
            .since(now)
            .until(now)
            .oldest_first();

        let (where_clause, params) = query.build_where();
        assert!(where_clause.contains("d.sensor_id = ?"));
        assert!(where_clause.contains("d.date >= ?"));
        assert!(where_clause.contains("d.date <= ?"));
        assert_eq!(params.len(), 3);
        assert!(query.build_sql().contains("ORDER BY d.date ASC"));
    }

    #[test]
    fn test_pagination() {
        let sql = ReadingDataQuery::new().limit(10).offset(20).build_sql();
        assert!(sql.ends_with("LIMIT 10 OFFSET 20"));

        let sql = ReadingDataQuery::new().offset(5).build_sql();
        assert!(sql.ends_with("LIMIT -1 OFFSET 5"));
    }
}
