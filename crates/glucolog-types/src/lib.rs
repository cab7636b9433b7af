//! Platform-agnostic types for glucose sensor scan data.
//!
//! A sensor scan produces a [`ReadingData`] record holding two series of
//! [`GlucoseReading`]s: the short-term *trend* (the last minutes, one value
//! per minute) and the long-term *history* (the last hours, one value per
//! quarter hour).
//!
//! # Example
//!
//! ```
//! use glucolog_types::{GlucoseReading, GlucoseUnit, ReadingData, ReadingKind};
//! use time::macros::datetime;
//!
//! let date = datetime!(2024-03-01 08:30 UTC);
//! let mut scan = ReadingData::new("E007-0000ABCD", 1440, date);
//! scan.trend.push(GlucoseReading::new("E007-0000ABCD", 1440, date, 112.0, ReadingKind::Trend));
//!
//! assert_eq!(scan.id, "E007-0000ABCD_1440");
//! assert!(scan.has_trend());
//! assert_eq!(GlucoseUnit::MmolL.format(112.0), "6.2 mmol/L");
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{GlucoseReading, GlucoseUnit, ReadingData, ReadingKind};
