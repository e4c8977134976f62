//! CSV readers for the three raw inputs.
//!
//! Each reader deserializes rows into a loose string-typed shape first, then
//! converts field by field. A bad value becomes unknown and is logged; a row
//! whose date cannot be read is dropped. Nothing here aborts a run for one bad cell.

pub mod bulletin;
pub mod summary;
pub mod vaccination;

use chrono::{NaiveDate, NaiveDateTime};
use std::io::Read;
use tracing::warn;

/// Token the government summary uses for "no value".
pub const MISSING_SENTINEL: &str = ":";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// A header-keyed reader that tolerates rows with too few or too many fields.
pub(crate) fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().flexible(true).from_reader(reader)
}

fn is_missing(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw == MISSING_SENTINEL || raw.eq_ignore_ascii_case("nan")
}

/// Parses `2022-01-12`, `12/01/2022` or `2022-01-12 00:00:00`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Parses a non-negative whole count. Accepts `12`, `12.0` and `1,234`.
pub fn parse_count(field: &str, raw: Option<&str>) -> Option<u32> {
    let raw = raw.filter(|r| !is_missing(r))?;
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => {
            Some(v as u32)
        }
        _ => {
            warn!(field, value = raw, "Malformed count, treating as unknown");
            None
        }
    }
}

/// Parses a percentage in `0..=100`. A lone decimal comma (`68,91`) is accepted.
pub fn parse_percentage(field: &str, raw: Option<&str>) -> Option<f64> {
    let raw = raw.filter(|r| !is_missing(r))?;
    let trimmed = raw.trim().trim_end_matches('%').trim();
    let normalized = if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        trimmed.replace(',', ".")
    };

    match normalized.parse::<f64>() {
        Ok(v) if (0.0..=100.0).contains(&v) => Some(v),
        _ => {
            warn!(field, value = raw, "Malformed percentage, treating as unknown");
            None
        }
    }
}
