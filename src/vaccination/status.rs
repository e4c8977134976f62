//! Vaccination status breakdown per age group (the "immunity wall").
//!
//! Each group's population is split into four stacked bands that add up to the
//! group denominator: boosted, fully vaccinated but not boosted, at least one
//! dose but not fully vaccinated, and unvaccinated.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::normalize::{doses_of, percent_of, with_adult_aggregate};
use super::policy::{BoosterPolicy, StatusCounts, VaccineKind};
use crate::error::{PipelineError, Result};
use crate::sources::vaccination::VaccinationDoseRecord;

/// Groups shown by default, in display order.
pub const DEFAULT_STATUS_GROUPS: &[&str] = &[
    "ALL", "Age18+", "Age10_14", "Age15_17", "Age18_24", "Age25_49", "Age50_59", "Age60_69",
    "Age70_79", "Age80+",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VaccinationStatus {
    #[serde(rename = "Boosted")]
    Boosted,
    #[serde(rename = "Fully vaccinated")]
    FullyVaccinated,
    #[serde(rename = "At least one dose")]
    AtLeastOneDose,
    #[serde(rename = "Unvaccinated")]
    Unvaccinated,
}

/// One status of one group. `people` is everyone with that status (nested:
/// the boosted are also fully vaccinated); `band` excludes the status above it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStatusRow {
    pub target_group: String,
    pub label: String,
    pub status: VaccinationStatus,
    pub people: i64,
    pub band: i64,
    pub pct: Option<f64>,
    pub band_pct: Option<f64>,
    pub target_population: u64,
}

/// Display label for a group code: `ALL` → `All ages`, `Age18_24` → `18-24`.
pub fn group_label(group: &str) -> String {
    if group == "ALL" {
        return "All ages".to_string();
    }
    group.strip_prefix("Age").unwrap_or(group).replace('_', "-")
}

fn signed_percent(part: i64, denominator: u64) -> Option<f64> {
    if part >= 0 {
        percent_of(part as u64, denominator)
    } else {
        percent_of(part.unsigned_abs(), denominator).map(|p| -p)
    }
}

/// Totals over all weeks for each group, as four rows per group.
///
/// Only the listed products are summed (see [`VaccineKind::known`]); doses of
/// an unknown product (`UNK`) are left out. The group still counts toward the
/// denominator.
///
/// # Errors
///
/// [`PipelineError::UnknownTargetGroup`] for a group without rows.
pub fn vaccination_status_by_group(
    records: &[VaccinationDoseRecord],
    groups: &[&str],
    policy: BoosterPolicy,
) -> Result<Vec<GroupStatusRow>> {
    let records = with_adult_aggregate(records);

    let mut totals: BTreeMap<&str, (StatusCounts, u64)> = BTreeMap::new();
    for r in &records {
        let (status, denominator) = totals
            .entry(r.target_group.as_str())
            .or_insert((StatusCounts::default(), r.denominator));
        *denominator = (*denominator).max(r.denominator);

        match VaccineKind::known(&r.vaccine) {
            Some(kind) => *status += policy.classify(kind, &doses_of(r)),
            None => {
                debug!(vaccine = %r.vaccine, week = %r.week, "Product left out of status totals")
            }
        }
    }

    let mut out = Vec::with_capacity(groups.len() * 4);
    for &group in groups {
        let Some((status, denominator)) = totals.get(group) else {
            return Err(PipelineError::UnknownTargetGroup(group.to_string()));
        };

        let boosted = status.boosted as i64;
        let full = status.completing_scheme as i64;
        let at_least_one = status.at_least_one_dose as i64;
        let unvaccinated = *denominator as i64 - at_least_one;

        let label = group_label(group);
        let rows = [
            (VaccinationStatus::Boosted, boosted, boosted),
            (VaccinationStatus::FullyVaccinated, full, full - boosted),
            (VaccinationStatus::AtLeastOneDose, at_least_one, at_least_one - full),
            (VaccinationStatus::Unvaccinated, unvaccinated, unvaccinated),
        ];
        for (status, people, band) in rows {
            out.push(GroupStatusRow {
                target_group: group.to_string(),
                label: label.clone(),
                status,
                people,
                band,
                pct: signed_percent(people, *denominator),
                band_pct: signed_percent(band, *denominator),
                target_population: *denominator,
            });
        }
    }

    Ok(out)
}
