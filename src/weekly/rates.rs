use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{info, warn};

use super::aggregate::weekly_means;
use super::types::{WeeklyHospitalization, WeeklyRateRecord};
use super::utility::per_100k;
use crate::error::{PipelineError, Result};
use crate::records::DailyRecord;
use crate::vaccination::VaccinationWeekSummary;

/// Hospitalizations per 100,000 vaccinated and unvaccinated residents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HospitalizationRates {
    pub unvaccinated_population: Option<f64>,
    pub vaccinated_per_100k: Option<f64>,
    pub unvaccinated_per_100k: Option<f64>,
    pub ratio: Option<f64>,
}

impl HospitalizationRates {
    /// The vaccinated population is everyone who completed the primary scheme;
    /// the rest of the target denominator is unvaccinated.
    pub fn compute(
        hospitalized_vaccinated: Option<f64>,
        hospitalized_unvaccinated: Option<f64>,
        denominator: Option<u64>,
        completing_scheme_cumsum: Option<u64>,
    ) -> Self {
        let vaccinated_population = completing_scheme_cumsum.map(|c| c as f64);
        let unvaccinated_population = match (denominator, completing_scheme_cumsum) {
            (Some(d), Some(c)) => Some(d as f64 - c as f64),
            _ => None,
        };

        let vaccinated_per_100k = per_100k(hospitalized_vaccinated, vaccinated_population);
        let unvaccinated_per_100k = per_100k(hospitalized_unvaccinated, unvaccinated_population);

        HospitalizationRates {
            unvaccinated_population,
            vaccinated_per_100k,
            unvaccinated_per_100k,
            ratio: ratio(unvaccinated_per_100k, vaccinated_per_100k),
        }
    }
}

/// How many times higher the unvaccinated rate is. Unknown if the vaccinated rate is zero.
pub fn ratio(unvaccinated: Option<f64>, vaccinated: Option<f64>) -> Option<f64> {
    match (unvaccinated, vaccinated) {
        (Some(u), Some(v)) if v > 0.0 => Some(u / v),
        _ => None,
    }
}

/// Weekly hospitalization rates per vaccination status.
///
/// `vaccination` holds the weekly summary of a single target group. Daily
/// records are averaged per week (see [`weekly_means`]) and left-joined to it
/// on the Thursday anchor.
///
/// # Errors
///
/// [`PipelineError::NoOverlap`] when no weekly anchor matches a vaccination week.
#[tracing::instrument(skip_all, fields(days = daily.len(), vaccination_weeks = vaccination.len()))]
pub fn compute_weekly_rates(
    daily: &[DailyRecord],
    vaccination: &[VaccinationWeekSummary],
    activation: NaiveDate,
) -> Result<Vec<WeeklyRateRecord>> {
    let mut by_midweek: HashMap<NaiveDate, &VaccinationWeekSummary> = HashMap::new();
    for summary in vaccination {
        if by_midweek.insert(summary.midweek, summary).is_some() {
            warn!(
                midweek = %summary.midweek,
                "Several vaccination rows share a week anchor, keeping the later one"
            );
        }
    }

    let weeks = weekly_means(daily, activation);
    let vaccination_of = |week: &WeeklyHospitalization| {
        if week.aligned {
            by_midweek.get(&week.midweek).copied()
        } else {
            None
        }
    };
    let matched = weeks.iter().filter(|w| vaccination_of(*w).is_some()).count();
    if matched == 0 {
        return Err(PipelineError::NoOverlap);
    }

    let rows: Vec<WeeklyRateRecord> = weeks
        .into_iter()
        .map(|week| {
            let vacc = vaccination_of(&week);
            let denominator = vacc.map(|v| v.denominator);
            let cumsum = vacc.map(|v| v.completing_scheme_cumsum);
            let rates = HospitalizationRates::compute(
                week.hospitalized_vaccinated,
                week.hospitalized_unvaccinated,
                denominator,
                cumsum,
            );

            WeeklyRateRecord {
                midweek: week.midweek,
                week_index: week.week_index,
                hospitalized_vaccinated: week.hospitalized_vaccinated,
                hospitalized_unvaccinated: week.hospitalized_unvaccinated,
                denominator,
                completing_scheme_cumsum: cumsum,
                completing_scheme_pct: vacc.and_then(|v| v.completing_scheme_pct),
                at_least_one_dose_cumsum: vacc.map(|v| v.at_least_one_dose_cumsum),
                boosted_cumsum: vacc.map(|v| v.boosted_cumsum),
                unvaccinated_population: rates.unvaccinated_population,
                rate_vaccinated_per_100k: rates.vaccinated_per_100k,
                rate_unvaccinated_per_100k: rates.unvaccinated_per_100k,
                ratio: rates.ratio,
            }
        })
        .collect();

    let undefined = rows.iter().filter(|r| r.ratio.is_none()).count();
    info!(weeks = rows.len(), matched, undefined, "Weekly rates computed");
    Ok(rows)
}
