use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::policy::{BoosterPolicy, DoseCounts, StatusCounts, VaccineKind};
use crate::calendar::YearWeek;
use crate::error::{PipelineError, Result};
use crate::sources::vaccination::VaccinationDoseRecord;

/// Adult sub-groups summed into [`ADULT_AGGREGATE_GROUP`].
pub const ADULT_GROUPS: &[&str] = &[
    "Age18_24", "Age25_49", "Age50_59", "Age60_69", "Age70_79", "Age80+",
];

pub const ADULT_AGGREGATE_GROUP: &str = "Age18+";

/// Per-week vaccination status for one target group, with running totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaccinationWeekSummary {
    pub week: YearWeek,
    pub midweek: NaiveDate,
    pub target_group: String,
    pub denominator: u64,
    pub population: u64,
    pub completing_scheme: u64,
    pub at_least_one_dose: u64,
    pub boosted: u64,
    pub completing_scheme_cumsum: u64,
    pub at_least_one_dose_cumsum: u64,
    pub boosted_cumsum: u64,
    pub completing_scheme_pct: Option<f64>,
    pub at_least_one_dose_pct: Option<f64>,
    pub boosted_pct: Option<f64>,
}

pub(crate) fn doses_of(record: &VaccinationDoseRecord) -> DoseCounts {
    DoseCounts {
        first_dose: record.first_dose,
        second_dose: record.second_dose,
        additional_dose_1: record.additional_dose_1,
    }
}

pub(crate) fn percent_of(part: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(part as f64 * 100.0 / denominator as f64)
    }
}

/// Returns `records` plus synthetic `Age18+` rows, one per (week, product),
/// summing the adult sub-groups.
///
/// The synthetic denominator is the sum of the adult sub-group denominators;
/// population is carried over unchanged. Nothing is added when the data
/// already has `Age18+` rows or no adult sub-group at all.
pub fn with_adult_aggregate(records: &[VaccinationDoseRecord]) -> Vec<VaccinationDoseRecord> {
    let mut out = records.to_vec();

    if records.iter().any(|r| r.target_group == ADULT_AGGREGATE_GROUP) {
        debug!("Source already carries an adult aggregate group");
        return out;
    }

    let mut group_denominators: HashMap<&str, u64> = HashMap::new();
    let mut by_week_product: BTreeMap<(YearWeek, &str), (DoseCounts, u64)> = BTreeMap::new();

    for r in records.iter().filter(|r| ADULT_GROUPS.contains(&r.target_group.as_str())) {
        group_denominators.entry(r.target_group.as_str()).or_insert(r.denominator);

        let (doses, population) = by_week_product
            .entry((r.week, r.vaccine.as_str()))
            .or_insert((DoseCounts::default(), r.population));
        doses.first_dose = doses.first_dose.saturating_add(r.first_dose);
        doses.second_dose = doses.second_dose.saturating_add(r.second_dose);
        doses.additional_dose_1 = doses.additional_dose_1.saturating_add(r.additional_dose_1);
        *population = (*population).max(r.population);
    }

    let adult_denominator = group_denominators
        .values()
        .fold(0u64, |sum, d| sum.saturating_add(*d));

    for ((week, vaccine), (doses, population)) in by_week_product {
        out.push(VaccinationDoseRecord {
            week,
            target_group: ADULT_AGGREGATE_GROUP.to_string(),
            vaccine: vaccine.to_string(),
            first_dose: doses.first_dose,
            second_dose: doses.second_dose,
            additional_dose_1: doses.additional_dose_1,
            denominator: adult_denominator,
            population,
        });
    }

    debug!(
        groups = group_denominators.len(),
        adult_denominator,
        "Synthesized adult aggregate group"
    );
    out
}

/// Weekly vaccination status per target group, with cumulative sums in
/// chronological week order and their share of the group denominator.
///
/// Percentages are not clamped: an upstream overcount shows up above 100.
///
/// # Errors
///
/// [`PipelineError::UnknownTargetGroup`] for a group without rows.
#[tracing::instrument(skip(records), fields(rows = records.len()))]
pub fn normalize_vaccination(
    records: &[VaccinationDoseRecord],
    target_groups: &[&str],
    policy: BoosterPolicy,
) -> Result<Vec<VaccinationWeekSummary>> {
    let records = with_adult_aggregate(records);
    let mut out = Vec::new();

    for &group in target_groups {
        let mut weeks: BTreeMap<YearWeek, (StatusCounts, u64, u64)> = BTreeMap::new();

        for r in records.iter().filter(|r| r.target_group == group) {
            let (status, denominator, population) = weeks
                .entry(r.week)
                .or_insert((StatusCounts::default(), r.denominator, r.population));
            *status += policy.classify(VaccineKind::of(&r.vaccine), &doses_of(r));
            if r.denominator != *denominator {
                warn!(
                    group,
                    week = %r.week,
                    vaccine = %r.vaccine,
                    "Denominator differs between products"
                );
            }
            *population = (*population).max(r.population);
        }

        if weeks.is_empty() {
            return Err(PipelineError::UnknownTargetGroup(group.to_string()));
        }

        let mut running = StatusCounts::default();
        for (week, (status, denominator, population)) in weeks {
            let Some(midweek) = week.thursday() else {
                warn!(%week, "Skipping week without a Thursday");
                continue;
            };
            running += status;

            out.push(VaccinationWeekSummary {
                week,
                midweek,
                target_group: group.to_string(),
                denominator,
                population,
                completing_scheme: status.completing_scheme,
                at_least_one_dose: status.at_least_one_dose,
                boosted: status.boosted,
                completing_scheme_cumsum: running.completing_scheme,
                at_least_one_dose_cumsum: running.at_least_one_dose,
                boosted_cumsum: running.boosted,
                completing_scheme_pct: percent_of(running.completing_scheme, denominator),
                at_least_one_dose_pct: percent_of(running.at_least_one_dose, denominator),
                boosted_pct: percent_of(running.boosted, denominator),
            });
        }
    }

    Ok(out)
}
