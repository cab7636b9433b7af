//! Core types for glucose sensor scan data.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;

/// Conversion factor between mg/dL and mmol/L for glucose.
pub const MG_DL_PER_MMOL_L: f32 = 18.0;

/// Which series of a scan a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ReadingKind {
    /// Short-term series, one value per minute.
    Trend,
    /// Long-term series, one value per fifteen minutes.
    History,
}

impl ReadingKind {
    /// Label used for storage and display.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingKind::Trend => "trend",
            ReadingKind::History => "history",
        }
    }
}

impl FromStr for ReadingKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trend" => Ok(ReadingKind::Trend),
            "history" => Ok(ReadingKind::History),
            _ => Err(ParseError::UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit used to present glucose values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GlucoseUnit {
    /// Milligrams per decilitre.
    #[default]
    MgDl,
    /// Millimoles per litre.
    MmolL,
}

impl GlucoseUnit {
    /// Convert a value in mg/dL into this unit.
    #[must_use]
    pub fn convert(&self, mg_dl: f32) -> f32 {
        match self {
            GlucoseUnit::MgDl => mg_dl,
            GlucoseUnit::MmolL => mg_dl / MG_DL_PER_MMOL_L,
        }
    }

    /// Unit suffix for display.
    #[must_use]
    pub fn suffix(&self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }

    /// Format a value in mg/dL with this unit's precision and suffix.
    ///
    /// ```
    /// use glucolog_types::GlucoseUnit;
    ///
    /// assert_eq!(GlucoseUnit::MgDl.format(98.4), "98 mg/dL");
    /// assert_eq!(GlucoseUnit::MmolL.format(98.4), "5.5 mmol/L");
    /// ```
    #[must_use]
    pub fn format(&self, mg_dl: f32) -> String {
        match self {
            GlucoseUnit::MgDl => format!("{:.0} {}", self.convert(mg_dl), self.suffix()),
            GlucoseUnit::MmolL => format!("{:.1} {}", self.convert(mg_dl), self.suffix()),
        }
    }
}

impl FromStr for GlucoseUnit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['/', ' '], "").as_str() {
            "mgdl" => Ok(GlucoseUnit::MgDl),
            "mmol" | "mmoll" => Ok(GlucoseUnit::MmolL),
            _ => Err(ParseError::UnknownUnit(s.to_string())),
        }
    }
}

impl fmt::Display for GlucoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A single glucose value from a sensor scan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlucoseReading {
    /// Serial of the sensor that produced the value.
    pub sensor_id: String,
    /// Sensor age in minutes at which the value was measured.
    pub sensor_time_minutes: u32,
    /// Wall-clock time of the measurement.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub date: OffsetDateTime,
    /// Glucose concentration in mg/dL.
    pub glucose_mg_dl: f32,
    /// Series the value belongs to.
    pub kind: ReadingKind,
}

impl GlucoseReading {
    /// Create a new reading.
    pub fn new(
        sensor_id: impl Into<String>,
        sensor_time_minutes: u32,
        date: OffsetDateTime,
        glucose_mg_dl: f32,
        kind: ReadingKind,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            sensor_time_minutes,
            date,
            glucose_mg_dl,
            kind,
        }
    }

    /// Glucose value converted to `unit`.
    #[must_use]
    pub fn glucose(&self, unit: GlucoseUnit) -> f32 {
        unit.convert(self.glucose_mg_dl)
    }
}

/// One sensor scan with its trend and history series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReadingData {
    /// Record identifier, `"{sensor_id}_{sensor_age_minutes}"`.
    pub id: String,
    /// Serial of the scanned sensor.
    pub sensor_id: String,
    /// Sensor age in minutes at scan time.
    pub sensor_age_minutes: u32,
    /// Time of the scan.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub date: OffsetDateTime,
    /// UTC offset of the device at scan time, in minutes.
    #[cfg_attr(feature = "serde", serde(default))]
    pub timezone_offset_minutes: i32,
    /// Short-term series, oldest first.
    #[cfg_attr(feature = "serde", serde(default))]
    pub trend: Vec<GlucoseReading>,
    /// Long-term series, oldest first.
    #[cfg_attr(feature = "serde", serde(default))]
    pub history: Vec<GlucoseReading>,
}

impl ReadingData {
    /// Create an empty scan record. The timezone offset is taken from `date`.
    pub fn new(sensor_id: impl Into<String>, sensor_age_minutes: u32, date: OffsetDateTime) -> Self {
        let sensor_id = sensor_id.into();
        Self {
            id: Self::make_id(&sensor_id, sensor_age_minutes),
            sensor_id,
            sensor_age_minutes,
            date,
            timezone_offset_minutes: i32::from(date.offset().whole_minutes()),
            trend: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Build the record identifier for a sensor and age.
    #[must_use]
    pub fn make_id(sensor_id: &str, sensor_age_minutes: u32) -> String {
        format!("{}_{}", sensor_id, sensor_age_minutes)
    }

    /// Whether the scan carries any trend values.
    #[must_use]
    pub fn has_trend(&self) -> bool {
        !self.trend.is_empty()
    }

    /// Most recent trend value, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&GlucoseReading> {
        self.trend.iter().max_by_key(|r| r.sensor_time_minutes)
    }

    /// All readings of both series.
    pub fn readings(&self) -> impl Iterator<Item = &GlucoseReading> {
        self.trend.iter().chain(self.history.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn scan() -> ReadingData {
        let date = datetime!(2024-03-01 08:30 +01:00);
        let mut data = ReadingData::new("E007-1", 600, date);
        data.trend.push(GlucoseReading::new("E007-1", 599, date, 101.0, ReadingKind::Trend));
        data.trend.push(GlucoseReading::new("E007-1", 600, date, 104.0, ReadingKind::Trend));
        data.history.push(GlucoseReading::new("E007-1", 585, date, 97.0, ReadingKind::History));
        data
    }

    #[test]
    fn test_new_derives_id_and_offset() {
        let data = scan();
        assert_eq!(data.id, "E007-1_600");
        assert_eq!(data.timezone_offset_minutes, 60);
    }

    #[test]
    fn test_has_trend() {
        let date = datetime!(2024-03-01 08:30 UTC);
        let empty = ReadingData::new("E007-1", 1, date);
        assert!(!empty.has_trend());
        assert!(scan().has_trend());
    }

    #[test]
    fn test_latest_picks_newest_sensor_time() {
        let data = scan();
        assert_eq!(data.latest().map(|r| r.glucose_mg_dl), Some(104.0));
    }

    #[test]
    fn test_readings_iterates_both_series() {
        assert_eq!(scan().readings().count(), 3);
    }

    #[test]
    fn test_unit_parse_and_convert() {
        assert_eq!("mg/dL".parse::<GlucoseUnit>(), Ok(GlucoseUnit::MgDl));
        assert_eq!("mmol".parse::<GlucoseUnit>(), Ok(GlucoseUnit::MmolL));
        assert!("ppm".parse::<GlucoseUnit>().is_err());
        assert!((GlucoseUnit::MmolL.convert(180.0) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("Trend".parse::<ReadingKind>(), Ok(ReadingKind::Trend));
        assert_eq!("history".parse::<ReadingKind>(), Ok(ReadingKind::History));
        assert_eq!(
            "raw".parse::<ReadingKind>(),
            Err(ParseError::UnknownKind("raw".to_string()))
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_uses_rfc3339_dates() {
        let json = serde_json::to_string(&scan()).unwrap();
        assert!(json.contains("\"date\":\"2024-03-01T08:30:00+01:00\""));
        assert!(json.contains("\"kind\":\"trend\""));

        let parsed: ReadingData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, scan());
    }
}
