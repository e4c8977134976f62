//! Hand-maintained corrections for known-bad upstream values.
//!
//! The table is data: a versioned JSON document with two kinds of entries.
//!
//! ```json
//! {
//!   "version": 3,
//!   "overrides": [
//!     { "date": "2022-01-18", "field": "deaths", "value": 5, "note": "..." }
//!   ],
//!   "synthetic_bulletins": [
//!     { "date": "2021-12-05", "hospitalized": 119, "pct_hospitalized_unvaccinated": 68.91,
//!       "new_cases": 307, "deaths": 0 }
//!   ]
//! }
//! ```
//!
//! Overrides replace one field of one day and win over every source.
//! Synthetic bulletins stand in for a day whose bulletin document is missing or wrong.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::PipelineError;
use crate::records::{BulletinRecord, DailyRecord};

const DEFAULT_TABLE: &str = include_str!("../corrections.json");

/// A daily field that an override can replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectedField {
    NewCases,
    Deaths,
    HospitalizedTotal,
    HospitalizedInIcu,
    HospitalizedIntubated,
    HospitalizedSevere,
    PctHospitalizedUnvaccinated,
}

impl CorrectedField {
    fn is_percentage(self) -> bool {
        matches!(self, CorrectedField::PctHospitalizedUnvaccinated)
    }

    /// Reads the field's current value, for logging what was replaced.
    pub fn get(self, record: &DailyRecord) -> Option<f64> {
        let count = |v: Option<u32>| v.map(f64::from);
        match self {
            CorrectedField::NewCases => count(record.new_cases),
            CorrectedField::Deaths => count(record.deaths),
            CorrectedField::HospitalizedTotal => count(record.hospitalized_total),
            CorrectedField::HospitalizedInIcu => count(record.hospitalized_in_icu),
            CorrectedField::HospitalizedIntubated => count(record.hospitalized_intubated),
            CorrectedField::HospitalizedSevere => count(record.hospitalized_severe),
            CorrectedField::PctHospitalizedUnvaccinated => record.pct_hospitalized_unvaccinated,
        }
    }

    /// Writes `value` into the record. `value` must have passed [`CorrectionTable::validate`].
    pub fn set(self, record: &mut DailyRecord, value: f64) {
        let count = Some(value as u32);
        match self {
            CorrectedField::NewCases => record.new_cases = count,
            CorrectedField::Deaths => record.deaths = count,
            CorrectedField::HospitalizedTotal => record.hospitalized_total = count,
            CorrectedField::HospitalizedInIcu => record.hospitalized_in_icu = count,
            CorrectedField::HospitalizedIntubated => record.hospitalized_intubated = count,
            CorrectedField::HospitalizedSevere => record.hospitalized_severe = count,
            CorrectedField::PctHospitalizedUnvaccinated => {
                record.pct_hospitalized_unvaccinated = Some(value)
            }
        }
    }
}

impl fmt::Display for CorrectedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CorrectedField::NewCases => "new_cases",
            CorrectedField::Deaths => "deaths",
            CorrectedField::HospitalizedTotal => "hospitalized_total",
            CorrectedField::HospitalizedInIcu => "hospitalized_in_icu",
            CorrectedField::HospitalizedIntubated => "hospitalized_intubated",
            CorrectedField::HospitalizedSevere => "hospitalized_severe",
            CorrectedField::PctHospitalizedUnvaccinated => "pct_hospitalized_unvaccinated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOverride {
    pub date: NaiveDate,
    pub field: CorrectedField,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticBulletin {
    pub date: NaiveDate,
    pub hospitalized: Option<u32>,
    pub pct_hospitalized_unvaccinated: Option<f64>,
    pub new_cases: Option<u32>,
    pub deaths: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SyntheticBulletin {
    pub fn to_bulletin(&self) -> BulletinRecord {
        BulletinRecord {
            date: self.date,
            hospitalized: self.hospitalized,
            pct_hospitalized_unvaccinated: self.pct_hospitalized_unvaccinated,
            new_cases: self.new_cases,
            deaths: self.deaths,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrectionTable {
    pub version: u32,
    #[serde(default)]
    pub overrides: Vec<FieldOverride>,
    #[serde(default)]
    pub synthetic_bulletins: Vec<SyntheticBulletin>,
}

impl CorrectionTable {
    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_TABLE).context("parsing built-in correction table")
    }

    /// Loads a table from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading corrections {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("parsing corrections {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let table: CorrectionTable = serde_json::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    /// Rejects entries that could not be applied faithfully.
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        let mut seen = HashSet::new();

        for o in &self.overrides {
            let invalid = |reason: &str| PipelineError::InvalidCorrection {
                date: o.date,
                field: o.field.to_string(),
                reason: reason.to_string(),
            };

            if !seen.insert((o.date, o.field)) {
                return Err(invalid("duplicate override for the same day and field"));
            }
            if o.field.is_percentage() {
                if !(0.0..=100.0).contains(&o.value) {
                    return Err(invalid("percentage must be within 0..=100"));
                }
            } else if !(o.value >= 0.0
                && o.value.fract() == 0.0
                && o.value <= f64::from(u32::MAX))
            {
                return Err(invalid("count must be a non-negative integer"));
            }
        }

        let mut synthetic_days = HashSet::new();
        for s in &self.synthetic_bulletins {
            if !synthetic_days.insert(s.date) {
                return Err(PipelineError::InvalidCorrection {
                    date: s.date,
                    field: "synthetic_bulletin".to_string(),
                    reason: "duplicate synthetic bulletin for the same day".to_string(),
                });
            }
            if let Some(p) = s.pct_hospitalized_unvaccinated {
                if !(0.0..=100.0).contains(&p) {
                    return Err(PipelineError::InvalidCorrection {
                        date: s.date,
                        field: "pct_hospitalized_unvaccinated".to_string(),
                        reason: "percentage must be within 0..=100".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.synthetic_bulletins.is_empty()
    }
}
