//! Defaults for sources, file names and pipeline parameters.
//!
//! Every value here can be overridden from the command line or the
//! environment (see `main.rs`); these are only the fallbacks.

use chrono::NaiveDate;

use crate::vaccination::status::DEFAULT_STATUS_GROUPS;
use crate::vaccination::{ADULT_AGGREGATE_GROUP, BoosterPolicy};

pub const DEFAULT_SUMMARY_URL: &str =
    "https://www.data.gov.cy/sites/default/files/CY%20Covid19%20Open%20Data%20-%20Extended%20-%20new_246.csv";
pub const DEFAULT_VACCINATION_URL: &str =
    "https://www.data.gov.cy/sites/default/files/CY%20Vaccination%20Data%20by%20Target%20Group_19.csv";

pub const SUMMARY_FILE: &str = "dataset_sum_daily_stats.csv";
pub const BULLETIN_FILE: &str = "data_from_pdf_reports.csv";
pub const VACCINATION_FILE: &str = "vaccination_dataset.csv";

pub const DEFAULT_TOTAL_POPULATION: u64 = 888_005;

/// First day bulletins report the vaccination status of hospitalized patients.
pub const DEFAULT_BULLETIN_CUTOFF: &str = "2021-07-16";

pub const BULLETIN_CUTOFF_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2021, 7, 16) {
    Some(date) => date,
    None => panic!("bulletin cutoff is not a calendar date"),
};

pub fn default_bulletin_cutoff() -> NaiveDate {
    BULLETIN_CUTOFF_DATE
}

/// Parameters of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Bulletins before this day are ignored, and weekly rates start at it.
    pub bulletin_cutoff: NaiveDate,
    /// Vaccination group whose coverage normalizes the hospitalization rates.
    pub rate_target_group: String,
    /// Fills the `Population` column when the vaccination source lacks it.
    pub total_population: u64,
    pub booster_policy: BoosterPolicy,
    /// Groups of the per-age status table; groups without data are skipped.
    pub status_groups: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            bulletin_cutoff: default_bulletin_cutoff(),
            rate_target_group: ADULT_AGGREGATE_GROUP.to_string(),
            total_population: DEFAULT_TOTAL_POPULATION,
            booster_policy: BoosterPolicy::default(),
            status_groups: DEFAULT_STATUS_GROUPS.iter().map(|g| g.to_string()).collect(),
        }
    }
}
