//! Output formatting utilities for text, JSON, and CSV output.

use anyhow::Result;
use glucolog_types::{GlucoseReading, GlucoseUnit, ReadingData};
use owo_colors::OwoColorize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

/// Below this value (mg/dL) a reading is shown as low.
pub const LOW_MG_DL: f32 = 70.0;
/// Above this value (mg/dL) a reading is shown as high.
pub const HIGH_MG_DL: f32 = 180.0;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Unit for glucose values.
    pub unit: GlucoseUnit,
    /// Disable colored output.
    pub no_color: bool,
    /// Omit header row in CSV output.
    pub no_header: bool,
}

impl FormatOptions {
    pub fn new(unit: GlucoseUnit, no_color: bool) -> Self {
        Self {
            unit,
            no_color,
            no_header: false,
        }
    }

    pub fn with_no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    /// Format a glucose value, colored by range unless colors are off.
    pub fn format_glucose(&self, mg_dl: f32) -> String {
        let text = self.unit.format(mg_dl);
        if self.no_color {
            text
        } else if mg_dl < LOW_MG_DL {
            text.red().to_string()
        } else if mg_dl > HIGH_MG_DL {
            text.yellow().to_string()
        } else {
            text.green().to_string()
        }
    }

    /// CSV column name for glucose values.
    pub fn glucose_csv_header(&self) -> &'static str {
        match self.unit {
            GlucoseUnit::MgDl => "glucose_mg_dl",
            GlucoseUnit::MmolL => "glucose_mmol_l",
        }
    }

    /// Glucose value for CSV, in the configured unit.
    pub fn glucose_csv(&self, mg_dl: f32) -> String {
        match self.unit {
            GlucoseUnit::MgDl => format!("{:.0}", mg_dl),
            GlucoseUnit::MmolL => format!("{:.1}", self.unit.convert(mg_dl)),
        }
    }
}

/// Escape a value for CSV output.
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Short local date for tables: `2024-03-01 08:30`.
pub fn format_date(date: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]");
    date.format(fmt).unwrap_or_else(|_| date.to_string())
}

fn rfc3339(date: OffsetDateTime) -> String {
    date.format(&Rfc3339).unwrap_or_else(|_| date.to_string())
}

/// Serialize a value as pretty JSON.
pub fn as_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

// --- log ---

pub fn format_log_text(records: &[ReadingData], opts: &FormatOptions) -> String {
    if records.is_empty() {
        return "No scans recorded\n".to_string();
    }

    let mut out = format!(
        "{:<16}  {:<24}  {:>12}  {:>5}  {:>7}\n",
        "DATE", "ID", "GLUCOSE", "TREND", "HISTORY"
    );
    for record in records {
        let glucose = record
            .latest()
            .map(|r| opts.format_glucose(r.glucose_mg_dl))
            .unwrap_or_else(|| "-".to_string());
        // Pad on the plain text width, color codes would skew it
        let width = record
            .latest()
            .map(|r| opts.unit.format(r.glucose_mg_dl).len())
            .unwrap_or(1);
        let pad = " ".repeat(12usize.saturating_sub(width));
        out.push_str(&format!(
            "{:<16}  {:<24}  {}{}  {:>5}  {:>7}\n",
            format_date(record.date),
            record.id,
            pad,
            glucose,
            record.trend.len(),
            record.history.len()
        ));
    }
    out
}

pub fn format_log_csv(records: &[ReadingData], opts: &FormatOptions) -> String {
    let mut out = String::new();
    if !opts.no_header {
        out.push_str(&format!(
            "id,sensor_id,sensor_age_minutes,date,{},trend_count,history_count\n",
            opts.glucose_csv_header()
        ));
    }
    for record in records {
        let glucose = record
            .latest()
            .map(|r| opts.glucose_csv(r.glucose_mg_dl))
            .unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            csv_escape(&record.id),
            csv_escape(&record.sensor_id),
            record.sensor_age_minutes,
            rfc3339(record.date),
            glucose,
            record.trend.len(),
            record.history.len()
        ));
    }
    out
}

pub fn format_log_json(records: &[ReadingData]) -> Result<String> {
    as_json(records)
}

// --- single scan ---

fn push_series(out: &mut String, title: &str, readings: &[GlucoseReading], opts: &FormatOptions) {
    out.push_str(&format!("{} ({} readings)\n", title, readings.len()));
    for reading in readings {
        out.push_str(&format!(
            "  {}  {:>6} min  {}\n",
            format_date(reading.date),
            reading.sensor_time_minutes,
            opts.format_glucose(reading.glucose_mg_dl)
        ));
    }
}

pub fn format_scan_text(record: &ReadingData, opts: &FormatOptions) -> String {
    let title = format!("Scan {}", record.id);
    let mut out = if opts.no_color {
        format!("{}\n", title)
    } else {
        format!("{}\n", title.bold())
    };

    out.push_str(&format!("  Sensor:      {}\n", record.sensor_id));
    out.push_str(&format!(
        "  Sensor age:  {} min\n",
        record.sensor_age_minutes
    ));
    out.push_str(&format!("  Date:        {}\n", rfc3339(record.date)));
    if let Some(latest) = record.latest() {
        out.push_str(&format!(
            "  Glucose:     {}\n",
            opts.format_glucose(latest.glucose_mg_dl)
        ));
    }
    out.push('\n');
    push_series(&mut out, "Trend", &record.trend, opts);
    push_series(&mut out, "History", &record.history, opts);
    out
}

pub fn format_scan_csv(record: &ReadingData, opts: &FormatOptions) -> String {
    let mut out = String::new();
    if !opts.no_header {
        out.push_str(&format!(
            "id,kind,sensor_time_minutes,date,{}\n",
            opts.glucose_csv_header()
        ));
    }
    for reading in record.readings() {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_escape(&record.id),
            reading.kind,
            reading.sensor_time_minutes,
            rfc3339(reading.date),
            opts.glucose_csv(reading.glucose_mg_dl)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glucolog_types::ReadingKind;
    use time::macros::datetime;

    fn sample() -> ReadingData {
        let date = datetime!(2024-03-01 08:30 UTC);
        let mut data = ReadingData::new("E007-9", 1440, date);
        data.history.push(GlucoseReading::new(
            "E007-9",
            1425,
            datetime!(2024-03-01 08:15 UTC),
            90.0,
            ReadingKind::History,
        ));
        data.trend.push(GlucoseReading::new(
            "E007-9",
            1440,
            date,
            108.0,
            ReadingKind::Trend,
        ));
        data
    }

    fn plain(unit: GlucoseUnit) -> FormatOptions {
        FormatOptions::new(unit, true)
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(datetime!(2024-03-01 08:30 UTC)), "2024-03-01 08:30");
    }

    #[test]
    fn test_log_text() {
        let out = format_log_text(&[sample()], &plain(GlucoseUnit::MgDl));
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("DATE"));
        assert!(lines[1].contains("E007-9_1440"));
        assert!(lines[1].contains("108 mg/dL"));
    }

    #[test]
    fn test_log_text_empty() {
        assert_eq!(
            format_log_text(&[], &plain(GlucoseUnit::MgDl)),
            "No scans recorded\n"
        );
    }

    #[test]
    fn test_log_csv_units() {
        let out = format_log_csv(&[sample()], &plain(GlucoseUnit::MmolL));
        assert_eq!(
            out,
            "id,sensor_id,sensor_age_minutes,date,glucose_mmol_l,trend_count,history_count\n\
             E007-9_1440,E007-9,1440,2024-03-01T08:30:00Z,6.0,1,1\n"
        );

        let no_header = plain(GlucoseUnit::MgDl).with_no_header(true);
        assert_eq!(
            format_log_csv(&[sample()], &no_header),
            "E007-9_1440,E007-9,1440,2024-03-01T08:30:00Z,108,1,1\n"
        );
    }

    #[test]
    fn test_log_json_is_array() {
        let json = format_log_json(&[sample()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["id"], "E007-9_1440");
        assert_eq!(value[0]["trend"][0]["glucose_mg_dl"], 108.0);
    }

    #[test]
    fn test_scan_text() {
        let out = format_scan_text(&sample(), &plain(GlucoseUnit::MgDl));
        assert!(out.starts_with("Scan E007-9_1440\n"));
        assert!(out.contains("Trend (1 readings)"));
        assert!(out.contains("History (1 readings)"));
        assert!(out.contains("90 mg/dL"));
    }

    #[test]
    fn test_scan_csv_lists_both_series() {
        let out = format_scan_csv(&sample(), &plain(GlucoseUnit::MgDl));
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "id,kind,sensor_time_minutes,date,glucose_mg_dl");
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().any(|l| l.contains(",trend,1440,")));
        assert!(lines.iter().any(|l| l.contains(",history,1425,")));
    }

    #[test]
    fn test_glucose_color_ranges() {
        let opts = FormatOptions::new(GlucoseUnit::MgDl, false);
        assert_eq!(opts.format_glucose(55.0), "55 mg/dL".red().to_string());
        assert_eq!(opts.format_glucose(120.0), "120 mg/dL".green().to_string());
        assert_eq!(opts.format_glucose(240.0), "240 mg/dL".yellow().to_string());
    }
}
