//! Row types of the weekly tables.

use chrono::NaiveDate;
use serde::Serialize;

/// Daily fields averaged over one week bucket.
///
/// `aligned` is false when days are missing between this bucket and the
/// previous one, so `midweek` is not the Thursday of the bucket's own ISO week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyHospitalization {
    pub midweek: NaiveDate,
    pub week_index: u32,
    pub aligned: bool,
    pub days: usize,
    pub new_cases: Option<f64>,
    pub deaths: Option<f64>,
    pub hospitalized_total: Option<f64>,
    pub hospitalized_in_icu: Option<f64>,
    pub hospitalized_intubated: Option<f64>,
    pub hospitalized_severe: Option<f64>,
    pub pct_hospitalized_unvaccinated: Option<f64>,
    pub hospitalized_vaccinated: Option<f64>,
    pub hospitalized_unvaccinated: Option<f64>,
}

/// Per-100k hospitalization rates of one week, joined with vaccination coverage.
///
/// Vaccination columns are empty for weeks the vaccination data does not cover;
/// the rates of such weeks are unknown but the row is kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyRateRecord {
    pub midweek: NaiveDate,
    pub week_index: u32,
    pub hospitalized_vaccinated: Option<f64>,
    pub hospitalized_unvaccinated: Option<f64>,
    pub denominator: Option<u64>,
    pub completing_scheme_cumsum: Option<u64>,
    pub completing_scheme_pct: Option<f64>,
    pub at_least_one_dose_cumsum: Option<u64>,
    pub boosted_cumsum: Option<u64>,
    pub unvaccinated_population: Option<f64>,
    pub rate_vaccinated_per_100k: Option<f64>,
    pub rate_unvaccinated_per_100k: Option<f64>,
    pub ratio: Option<f64>,
}
