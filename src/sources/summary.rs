//! Reader for the government summary dataset (one row per day, may lag).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use super::{csv_reader, parse_count, parse_date};
use crate::records::{DailyRecord, RecordOrigin};

#[derive(Debug, Deserialize)]
struct SummaryRow {
    date: Option<String>,
    #[serde(rename = "daily new cases", default)]
    new_cases: Option<String>,
    #[serde(rename = "daily deaths", default)]
    deaths: Option<String>,
    #[serde(rename = "Hospitalised Cases", default)]
    hospitalized: Option<String>,
    #[serde(rename = "Cases In ICUs", default)]
    in_icu: Option<String>,
    #[serde(rename = "Incubated Cases", default)]
    intubated: Option<String>,
    #[serde(rename = "Severe Cases", default)]
    severe: Option<String>,
}

/// Reads summary rows. Rows with a missing or unreadable date are dropped.
pub fn read_summary<R: Read>(reader: R) -> Result<Vec<DailyRecord>> {
    let mut rdr = csv_reader(reader);
    let mut records = Vec::new();

    for (line, result) in rdr.deserialize::<SummaryRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(row = line + 1, error = %e, "Skipping unreadable summary row");
                continue;
            }
        };

        let raw_date = row.date.as_deref().unwrap_or("");
        let Some(date) = parse_date(raw_date) else {
            warn!(row = line + 1, date = raw_date, "Dropping summary row with malformed date");
            continue;
        };

        records.push(DailyRecord {
            new_cases: parse_count("daily new cases", row.new_cases.as_deref()),
            deaths: parse_count("daily deaths", row.deaths.as_deref()),
            hospitalized_total: parse_count("Hospitalised Cases", row.hospitalized.as_deref()),
            hospitalized_in_icu: parse_count("Cases In ICUs", row.in_icu.as_deref()),
            hospitalized_intubated: parse_count("Incubated Cases", row.intubated.as_deref()),
            hospitalized_severe: parse_count("Severe Cases", row.severe.as_deref()),
            ..DailyRecord::empty(date, RecordOrigin::Summary)
        });
    }

    debug!(rows = records.len(), "Summary rows read");
    Ok(records)
}

pub fn load_summary(path: &Path) -> Result<Vec<DailyRecord>> {
    let file = File::open(path).with_context(|| format!("opening summary {}", path.display()))?;
    read_summary(file)
}
