//! Daily reconciliation of the government summary with the bulletin series.
//!
//! Precedence per day is correction > bulletin-derived > summary. The bulletin
//! only fills days strictly after the last summary day; gaps inside the summary
//! range are left as the summary reports them.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::corrections::CorrectionTable;
use crate::error::{PipelineError, Result};
use crate::records::{BulletinRecord, DailyRecord, RecordOrigin};

/// Bulletin rows persisted by an earlier run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreviousState {
    pub bulletins: Vec<BulletinRecord>,
}

/// Result of merging freshly extracted bulletins into the stored series.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletinUpdate {
    pub series: Vec<BulletinRecord>,
    pub added: Vec<NaiveDate>,
}

/// Merges extracted bulletin rows into the stored bulletin series.
///
/// With no previous state every extracted row on or after `cutoff` is new.
/// With a previous state only days it does not already hold are added; stored
/// rows are never replaced.
pub fn update_bulletin_series(
    previous: Option<PreviousState>,
    extracted: Vec<BulletinRecord>,
    cutoff: NaiveDate,
) -> BulletinUpdate {
    let mut series: BTreeMap<NaiveDate, BulletinRecord> = match previous {
        Some(state) => {
            debug!(stored = state.bulletins.len(), "Merging into stored bulletin series");
            state.bulletins.into_iter().map(|b| (b.date, b)).collect()
        }
        None => {
            info!("No stored bulletin series, treating all extracted rows as new");
            BTreeMap::new()
        }
    };

    let mut added = Vec::new();
    for bulletin in extracted {
        if bulletin.date < cutoff {
            debug!(date = %bulletin.date, "Skipping bulletin before cutoff");
            continue;
        }
        if series.contains_key(&bulletin.date) {
            continue;
        }
        added.push(bulletin.date);
        series.insert(bulletin.date, bulletin);
    }
    added.sort();

    info!(added = added.len(), total = series.len(), "Bulletin series updated");
    BulletinUpdate {
        series: series.into_values().collect(),
        added,
    }
}

/// Reconciles the summary and bulletin series into one record per day.
///
/// Steps: keep the summary as is; append bulletin days strictly after the
/// last summary day; attach each day's bulletin vaccination breakdown; insert
/// synthetic correction days that are still missing; apply field overrides last.
///
/// # Errors
///
/// [`PipelineError::EmptyInput`] when neither series has a row.
#[tracing::instrument(skip_all, fields(summary = summary.len(), bulletins = bulletins.len()))]
pub fn reconcile(
    summary: &[DailyRecord],
    bulletins: &[BulletinRecord],
    corrections: &CorrectionTable,
    cutoff: NaiveDate,
) -> Result<Vec<DailyRecord>> {
    if summary.is_empty() && bulletins.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let mut days: BTreeMap<NaiveDate, DailyRecord> = BTreeMap::new();
    for record in summary {
        if days.insert(record.date, record.clone()).is_some() {
            warn!(date = %record.date, "Duplicate summary day, keeping the later row");
        }
    }
    let last_summary_date = days.keys().next_back().copied();

    let bulletin_days = eligible_bulletins(bulletins, corrections, cutoff);

    let mut appended = 0usize;
    for (date, bulletin) in &bulletin_days {
        if last_summary_date.is_none_or(|last| *date > last) {
            let origin = if corrections.synthetic_bulletins.iter().any(|s| s.date == *date) {
                RecordOrigin::Correction
            } else {
                RecordOrigin::Bulletin
            };
            days.insert(*date, DailyRecord::from_bulletin(bulletin, origin));
            appended += 1;
        }
    }
    if appended == 0 {
        info!("No bulletin days beyond the summary");
    } else {
        info!(appended, after = ?last_summary_date, "Appended bulletin days");
    }

    for (date, record) in days.iter_mut() {
        if let Some(bulletin) = bulletin_days.get(date) {
            record.pct_hospitalized_unvaccinated = bulletin.pct_hospitalized_unvaccinated;
            record.hospitalized_from_bulletin = bulletin.hospitalized;
        }
    }

    for synthetic in &corrections.synthetic_bulletins {
        if !days.contains_key(&synthetic.date) {
            let bulletin = synthetic.to_bulletin();
            let mut record = DailyRecord::from_bulletin(&bulletin, RecordOrigin::Correction);
            record.pct_hospitalized_unvaccinated = bulletin.pct_hospitalized_unvaccinated;
            record.hospitalized_from_bulletin = bulletin.hospitalized;
            info!(date = %synthetic.date, "Inserted synthetic correction day");
            days.insert(synthetic.date, record);
        }
    }

    for o in &corrections.overrides {
        let record = days
            .entry(o.date)
            .or_insert_with(|| DailyRecord::empty(o.date, RecordOrigin::Correction));
        let previous = o.field.get(record);
        o.field.set(record, o.value);
        info!(date = %o.date, field = %o.field, ?previous, value = o.value, "Applied correction");
    }

    Ok(days.into_values().collect())
}

/// Bulletin rows eligible for use, keyed by day. Synthetic correction rows
/// replace whatever the extractor produced for their day.
fn eligible_bulletins(
    bulletins: &[BulletinRecord],
    corrections: &CorrectionTable,
    cutoff: NaiveDate,
) -> BTreeMap<NaiveDate, BulletinRecord> {
    let mut by_day = BTreeMap::new();
    let mut duplicates = BTreeSet::new();
    let mut before_cutoff = 0usize;

    for bulletin in bulletins {
        if bulletin.date < cutoff {
            before_cutoff += 1;
            continue;
        }
        if by_day.insert(bulletin.date, bulletin.clone()).is_some() {
            duplicates.insert(bulletin.date);
        }
    }
    if before_cutoff > 0 {
        debug!(before_cutoff, %cutoff, "Ignored bulletins before cutoff");
    }
    for date in duplicates {
        warn!(%date, "Duplicate bulletin day, keeping the later row");
    }

    for synthetic in &corrections.synthetic_bulletins {
        by_day.insert(synthetic.date, synthetic.to_bulletin());
    }

    by_day
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corrections::{CorrectedField, FieldOverride, SyntheticBulletin};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cutoff() -> NaiveDate {
        d(2021, 7, 16)
    }

    fn summary_day(date: NaiveDate, hosp: u32, deaths: u32) -> DailyRecord {
        DailyRecord {
            new_cases: Some(1000),
            deaths: Some(deaths),
            hospitalized_total: Some(hosp),
            hospitalized_in_icu: Some(30),
            hospitalized_intubated: Some(10),
            ..DailyRecord::empty(date, RecordOrigin::Summary)
        }
    }

    fn bulletin(date: NaiveDate, hosp: u32, pct: f64) -> BulletinRecord {
        BulletinRecord {
            date,
            hospitalized: Some(hosp),
            pct_hospitalized_unvaccinated: Some(pct),
            new_cases: Some(2000),
            deaths: Some(1),
        }
    }

    fn summary_through(last: NaiveDate, days: usize) -> Vec<DailyRecord> {
        let first = last - chrono::Duration::days(days as i64 - 1);
        first.iter_days().take(days).map(|date| summary_day(date, 200, 3)).collect()
    }

    #[test]
    fn test_empty_inputs_fail() {
        let err = reconcile(&[], &[], &CorrectionTable::default(), cutoff()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn test_bulletin_days_after_summary_are_appended() {
        let summary = summary_through(d(2022, 1, 10), 5);
        let bulletins: Vec<_> = d(2022, 1, 8)
            .iter_days()
            .take(5)
            .map(|date| bulletin(date, 230, 70.0))
            .collect();
        let bulletins = {
            let mut b = bulletins;
            b.last_mut().unwrap().hospitalized = Some(238);
            b
        };

        let out = reconcile(&summary, &bulletins, &CorrectionTable::default(), cutoff()).unwrap();

        assert_eq!(out.len(), 7);
        let last = out.last().unwrap();
        assert_eq!(last.date, d(2022, 1, 12));
        assert_eq!(last.hospitalized_total, Some(238));
        assert_eq!(last.hospitalized_in_icu, None);
        assert_eq!(last.hospitalized_intubated, None);
        assert_eq!(last.hospitalized_severe, None);
        assert_eq!(last.origin, RecordOrigin::Bulletin);
    }

    #[test]
    fn test_bulletin_never_backfills_inside_summary_range() {
        let summary = summary_through(d(2022, 1, 10), 3);
        let bulletins = vec![bulletin(d(2022, 1, 9), 999, 70.0)];

        let out = reconcile(&summary, &bulletins, &CorrectionTable::default(), cutoff()).unwrap();

        let day = out.iter().find(|r| r.date == d(2022, 1, 9)).unwrap();
        assert_eq!(day.hospitalized_total, Some(200));
        assert_eq!(day.origin, RecordOrigin::Summary);
        // the vaccination breakdown still comes from the bulletin
        assert_eq!(day.pct_hospitalized_unvaccinated, Some(70.0));
        assert_eq!(day.hospitalized_from_bulletin, Some(999));
    }

    #[test]
    fn test_output_equals_summary_when_no_newer_bulletins() {
        let summary = summary_through(d(2022, 1, 10), 4);
        let out = reconcile(&summary, &[], &CorrectionTable::default(), cutoff()).unwrap();
        assert_eq!(out, summary);
    }

    #[test]
    fn test_bulletins_before_cutoff_are_ignored() {
        let bulletins = vec![bulletin(d(2021, 7, 1), 50, 90.0), bulletin(d(2021, 7, 20), 60, 85.0)];
        let out = reconcile(&[], &bulletins, &CorrectionTable::default(), cutoff()).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date, d(2021, 7, 20));
    }

    #[test]
    fn test_override_wins_over_summary() {
        let summary = summary_through(d(2022, 1, 20), 5);
        let corrections = CorrectionTable {
            version: 1,
            overrides: vec![FieldOverride {
                date: d(2022, 1, 18),
                field: CorrectedField::Deaths,
                value: 5.0,
                note: None,
            }],
            synthetic_bulletins: vec![],
        };

        let out = reconcile(&summary, &[], &corrections, cutoff()).unwrap();

        let day = out.iter().find(|r| r.date == d(2022, 1, 18)).unwrap();
        assert_eq!(day.deaths, Some(5));
        assert_eq!(day.hospitalized_total, Some(200));
    }

    #[test]
    fn test_override_for_absent_day_inserts_record() {
        let summary = summary_through(d(2022, 1, 10), 2);
        let corrections = CorrectionTable {
            version: 1,
            overrides: vec![FieldOverride {
                date: d(2022, 1, 15),
                field: CorrectedField::HospitalizedTotal,
                value: 238.0,
                note: None,
            }],
            synthetic_bulletins: vec![],
        };

        let out = reconcile(&summary, &[], &corrections, cutoff()).unwrap();

        let last = out.last().unwrap();
        assert_eq!(last.date, d(2022, 1, 15));
        assert_eq!(last.hospitalized_total, Some(238));
        assert_eq!(last.deaths, None);
        assert_eq!(last.origin, RecordOrigin::Correction);
    }

    #[test]
    fn test_synthetic_bulletin_fills_missing_day_and_breakdown() {
        let summary = summary_through(d(2021, 12, 6), 3); // 4th..6th
        let bulletins = vec![bulletin(d(2021, 12, 5), 121, 69.5)]; // wrong document
        let corrections = CorrectionTable {
            version: 1,
            overrides: vec![],
            synthetic_bulletins: vec![
                SyntheticBulletin {
                    date: d(2021, 12, 5),
                    hospitalized: Some(119),
                    pct_hospitalized_unvaccinated: Some(68.91),
                    new_cases: Some(307),
                    deaths: Some(0),
                    note: None,
                },
                SyntheticBulletin {
                    date: d(2021, 12, 8),
                    hospitalized: Some(125),
                    pct_hospitalized_unvaccinated: Some(70.0),
                    new_cases: Some(400),
                    deaths: Some(1),
                    note: None,
                },
            ],
        };

        let out = reconcile(&summary, &bulletins, &corrections, cutoff()).unwrap();

        let fifth = out.iter().find(|r| r.date == d(2021, 12, 5)).unwrap();
        assert_eq!(fifth.pct_hospitalized_unvaccinated, Some(68.91));
        assert_eq!(fifth.hospitalized_from_bulletin, Some(119));
        assert_eq!(fifth.origin, RecordOrigin::Summary);

        // 2021-12-08 is after the summary, so it is appended from the correction
        let eighth = out.last().unwrap();
        assert_eq!(eighth.date, d(2021, 12, 8));
        assert_eq!(eighth.hospitalized_total, Some(125));
        assert_eq!(eighth.origin, RecordOrigin::Correction);
    }

    #[test]
    fn test_duplicate_summary_days_collapse() {
        let mut summary = summary_through(d(2022, 1, 10), 2);
        summary.push(summary_day(d(2022, 1, 10), 321, 4));

        let out = reconcile(&summary, &[], &CorrectionTable::default(), cutoff()).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].hospitalized_total, Some(321));
    }

    #[test]
    fn test_update_without_previous_state() {
        let extracted = vec![
            bulletin(d(2021, 7, 20), 60, 85.0),
            bulletin(d(2021, 7, 10), 60, 85.0),
            bulletin(d(2021, 7, 18), 60, 85.0),
        ];
        let update = update_bulletin_series(None, extracted, cutoff());

        assert_eq!(update.added, vec![d(2021, 7, 18), d(2021, 7, 20)]);
        assert_eq!(update.series.len(), 2);
        assert_eq!(update.series[0].date, d(2021, 7, 18));
    }

    #[test]
    fn test_update_keeps_stored_rows() {
        let previous = PreviousState {
            bulletins: vec![bulletin(d(2021, 7, 20), 60, 85.0)],
        };
        let extracted = vec![
            bulletin(d(2021, 7, 20), 999, 10.0),
            bulletin(d(2021, 7, 21), 61, 84.0),
        ];

        let update = update_bulletin_series(Some(previous), extracted, cutoff());

        assert_eq!(update.added, vec![d(2021, 7, 21)]);
        assert_eq!(update.series[0].hospitalized, Some(60));
        assert_eq!(update.series.len(), 2);
    }
}
