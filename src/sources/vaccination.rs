//! Reader for the weekly vaccination-by-target-group dataset.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use super::csv_reader;
use crate::calendar::YearWeek;

/// Dose counts for one (ISO week, target group, vaccine product).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccinationDoseRecord {
    pub week: YearWeek,
    pub target_group: String,
    pub vaccine: String,
    pub first_dose: u64,
    pub second_dose: u64,
    pub additional_dose_1: u64,
    pub denominator: u64,
    pub population: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VaccinationRow {
    #[serde(rename = "YearWeekISO")]
    year_week_iso: String,
    target_group: String,
    vaccine: String,
    #[serde(default)]
    first_dose: Option<String>,
    #[serde(default)]
    second_dose: Option<String>,
    // older extracts predate the additional-dose column
    #[serde(default)]
    dose_additional1: Option<String>,
    #[serde(default)]
    denominator: Option<String>,
    #[serde(default)]
    population: Option<String>,
}

/// Larger than any population the dataset can describe.
pub const MAX_COUNT: u64 = 1_000_000_000;

fn dose(field: &str, raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return 0;
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v <= MAX_COUNT as f64 => v.round() as u64,
        _ => {
            warn!(field, value = raw, "Malformed dose count, using 0");
            0
        }
    }
}

/// Reads dose rows; `total_population` fills a missing `Population` column.
pub fn read_vaccination<R: Read>(
    reader: R,
    total_population: u64,
) -> Result<Vec<VaccinationDoseRecord>> {
    let mut rdr = csv_reader(reader);
    let mut records = Vec::new();

    for (line, result) in rdr.deserialize::<VaccinationRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(row = line + 1, error = %e, "Skipping unreadable vaccination row");
                continue;
            }
        };

        let week = match row.year_week_iso.parse::<YearWeek>() {
            Ok(week) => week,
            Err(e) => {
                warn!(row = line + 1, error = %e, "Dropping vaccination row");
                continue;
            }
        };

        let population = match row.population.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => dose("Population", Some(p)),
            _ => total_population,
        };

        records.push(VaccinationDoseRecord {
            week,
            target_group: row.target_group.trim().to_string(),
            vaccine: row.vaccine.trim().to_string(),
            first_dose: dose("FirstDose", row.first_dose.as_deref()),
            second_dose: dose("SecondDose", row.second_dose.as_deref()),
            additional_dose_1: dose("DoseAdditional1", row.dose_additional1.as_deref()),
            denominator: dose("Denominator", row.denominator.as_deref()),
            population,
        });
    }

    debug!(rows = records.len(), "Vaccination rows read");
    Ok(records)
}

pub fn load_vaccination(
    path: &Path,
    total_population: u64,
) -> Result<Vec<VaccinationDoseRecord>> {
    let file = File::open(path)
        .with_context(|| format!("opening vaccination data {}", path.display()))?;
    read_vaccination(file, total_population)
}
