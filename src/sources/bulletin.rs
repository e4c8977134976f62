//! Reader and writer for the bulletin-derived dataset.
//!
//! Rows come from the external bulletin extractor. The same column layout is
//! used for the persisted bulletin store so it can be read back on the next run.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use super::{csv_reader, parse_count, parse_date, parse_percentage};
use crate::output::write_table;
use crate::records::BulletinRecord;

#[derive(Debug, Deserialize)]
struct BulletinRow {
    date: Option<String>,
    #[serde(rename = "hospitalizations_dailyrep", default)]
    hospitalized: Option<String>,
    #[serde(rename = "perc_hosp_unvaccinated", default)]
    pct_unvaccinated: Option<String>,
    #[serde(rename = "daily new cases", default)]
    new_cases: Option<String>,
    #[serde(rename = "daily deaths", default)]
    deaths: Option<String>,
}

#[derive(Debug, Serialize)]
struct BulletinStoreRow {
    date: NaiveDate,
    #[serde(rename = "hospitalizations_dailyrep")]
    hospitalized: Option<u32>,
    #[serde(rename = "perc_hosp_unvaccinated")]
    pct_unvaccinated: Option<f64>,
    #[serde(rename = "daily new cases")]
    new_cases: Option<u32>,
    #[serde(rename = "daily deaths")]
    deaths: Option<u32>,
    #[serde(rename = "perc_hosp_vaccinated")]
    pct_vaccinated: Option<f64>,
}

pub fn read_bulletins<R: Read>(reader: R) -> Result<Vec<BulletinRecord>> {
    let mut rdr = csv_reader(reader);
    let mut records = Vec::new();

    for (line, result) in rdr.deserialize::<BulletinRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(row = line + 1, error = %e, "Skipping unreadable bulletin row");
                continue;
            }
        };

        let raw_date = row.date.as_deref().unwrap_or("");
        let Some(date) = parse_date(raw_date) else {
            warn!(row = line + 1, date = raw_date, "Dropping bulletin row with malformed date");
            continue;
        };

        records.push(BulletinRecord {
            date,
            hospitalized: parse_count("hospitalizations_dailyrep", row.hospitalized.as_deref()),
            pct_hospitalized_unvaccinated: parse_percentage(
                "perc_hosp_unvaccinated",
                row.pct_unvaccinated.as_deref(),
            ),
            new_cases: parse_count("daily new cases", row.new_cases.as_deref()),
            deaths: parse_count("daily deaths", row.deaths.as_deref()),
        });
    }

    debug!(rows = records.len(), "Bulletin rows read");
    Ok(records)
}

pub fn load_bulletins(path: &Path) -> Result<Vec<BulletinRecord>> {
    let file = File::open(path).with_context(|| format!("opening bulletins {}", path.display()))?;
    read_bulletins(file)
}

/// Replaces the bulletin store at `path` with `records`.
pub fn save_bulletins(path: &Path, records: &[BulletinRecord]) -> Result<()> {
    let rows: Vec<BulletinStoreRow> = records
        .iter()
        .map(|b| BulletinStoreRow {
            date: b.date,
            hospitalized: b.hospitalized,
            pct_unvaccinated: b.pct_hospitalized_unvaccinated,
            new_cases: b.new_cases,
            deaths: b.deaths,
            pct_vaccinated: b.pct_hospitalized_vaccinated(),
        })
        .collect();
    write_table(path, &rows)
}
