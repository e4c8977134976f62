use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::types::WeeklyHospitalization;
use super::utility::mean_known;
use crate::calendar::{YearWeek, ascending_week_indices, midweek_for_index};
use crate::records::DailyRecord;

/// Averages daily records per week bucket.
///
/// Days are bucketed by their ascending week index and each bucket is dated
/// by its Thursday. Only weeks whose Thursday falls on or after `activation`
/// are returned. Each field is averaged over the days where it is known.
///
/// A bucket whose index-derived Thursday differs from the Thursday of its own
/// ISO week follows a gap in the series. It is kept but marked as not aligned.
pub fn weekly_means(records: &[DailyRecord], activation: NaiveDate) -> Vec<WeeklyHospitalization> {
    let mut sorted: Vec<&DailyRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.date);

    let Some(first_date) = sorted.first().map(|r| r.date) else {
        return Vec::new();
    };

    let dates: Vec<NaiveDate> = sorted.iter().map(|r| r.date).collect();
    let mut buckets: BTreeMap<u32, Vec<&DailyRecord>> = BTreeMap::new();
    for (record, index) in sorted.into_iter().zip(ascending_week_indices(&dates)) {
        buckets.entry(index).or_default().push(record);
    }

    let weeks: Vec<WeeklyHospitalization> = buckets
        .into_iter()
        .filter_map(|(week_index, days)| {
            let midweek = midweek_for_index(first_date, week_index);
            if midweek < activation {
                return None;
            }

            let own_thursday = YearWeek::of(days[0].date).thursday();
            let aligned = own_thursday == Some(midweek);
            if !aligned {
                warn!(
                    week_index,
                    %midweek,
                    first_day = %days[0].date,
                    "Week index drifted after a gap in the daily series"
                );
            }

            let count = |f: fn(&DailyRecord) -> Option<u32>| {
                mean_known(days.iter().map(|d| f(d).map(f64::from)))
            };

            Some(WeeklyHospitalization {
                midweek,
                week_index,
                aligned,
                days: days.len(),
                new_cases: count(|d| d.new_cases),
                deaths: count(|d| d.deaths),
                hospitalized_total: count(|d| d.hospitalized_total),
                hospitalized_in_icu: count(|d| d.hospitalized_in_icu),
                hospitalized_intubated: count(|d| d.hospitalized_intubated),
                hospitalized_severe: count(|d| d.hospitalized_severe),
                pct_hospitalized_unvaccinated: mean_known(
                    days.iter().map(|d| d.pct_hospitalized_unvaccinated),
                ),
                hospitalized_vaccinated: mean_known(
                    days.iter().map(|d| d.hospitalized_vaccinated()),
                ),
                hospitalized_unvaccinated: mean_known(
                    days.iter().map(|d| d.hospitalized_unvaccinated()),
                ),
            })
        })
        .collect();

    debug!(weeks = weeks.len(), %activation, "Weekly means computed");
    weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordOrigin;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn day(date: NaiveDate, hosp: Option<u32>, pct: Option<f64>) -> DailyRecord {
        DailyRecord {
            hospitalized_total: hosp,
            pct_hospitalized_unvaccinated: pct,
            ..DailyRecord::empty(date, RecordOrigin::Summary)
        }
    }

    #[test]
    fn test_one_row_per_week_anchored_on_thursday() {
        // Monday 2022-01-03 .. Sunday 2022-01-16: two full ISO weeks
        let records: Vec<_> = d(2022, 1, 3)
            .iter_days()
            .take(14)
            .map(|date| day(date, Some(100), Some(80.0)))
            .collect();

        let weeks = weekly_means(&records, d(2021, 7, 16));

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].midweek, d(2022, 1, 6));
        assert_eq!(weeks[1].midweek, d(2022, 1, 13));
        assert_eq!(weeks[0].days, 7);
        assert_eq!(weeks[0].hospitalized_unvaccinated, Some(80.0));
        assert_eq!(weeks[0].hospitalized_vaccinated, Some(20.0));
    }

    #[test]
    fn test_mean_ignores_unknown_days() {
        let records = vec![
            day(d(2022, 1, 3), Some(100), Some(50.0)),
            day(d(2022, 1, 4), None, None),
            day(d(2022, 1, 5), Some(200), Some(50.0)),
        ];
        let weeks = weekly_means(&records, d(2021, 7, 16));

        assert_eq!(weeks[0].hospitalized_total, Some(150.0));
        assert_eq!(weeks[0].hospitalized_unvaccinated, Some(75.0));
        assert_eq!(weeks[0].new_cases, None);
    }

    #[test]
    fn test_weeks_before_activation_dropped() {
        let records: Vec<_> = d(2021, 7, 5)
            .iter_days()
            .take(21)
            .map(|date| day(date, Some(10), Some(90.0)))
            .collect();

        let weeks = weekly_means(&records, d(2021, 7, 16));

        // Thursdays 07-08 and 07-15 are before activation; 07-22 is kept
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].midweek, d(2021, 7, 22));
        assert_eq!(weeks[0].week_index, 3);
    }

    #[test]
    fn test_unsorted_input_is_handled() {
        let records = vec![
            day(d(2022, 1, 11), Some(30), None),
            day(d(2022, 1, 3), Some(10), None),
        ];
        let weeks = weekly_means(&records, d(2021, 7, 16));

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].hospitalized_total, Some(10.0));
        assert_eq!(weeks[1].midweek, d(2022, 1, 13));
    }

    #[test]
    fn test_breakdown_fields_are_averaged() {
        let records = vec![
            DailyRecord {
                hospitalized_in_icu: Some(30),
                hospitalized_intubated: Some(10),
                hospitalized_severe: Some(5),
                ..day(d(2022, 1, 3), Some(100), None)
            },
            DailyRecord {
                hospitalized_in_icu: Some(40),
                hospitalized_intubated: Some(20),
                ..day(d(2022, 1, 4), Some(120), None)
            },
        ];
        let weeks = weekly_means(&records, d(2021, 7, 16));

        assert_eq!(weeks[0].hospitalized_in_icu, Some(35.0));
        assert_eq!(weeks[0].hospitalized_intubated, Some(15.0));
        assert_eq!(weeks[0].hospitalized_severe, Some(5.0));
    }

    #[test]
    fn test_gap_in_series_marks_bucket_unaligned() {
        // W29 of 2021, then nothing until Tuesday 2022-01-18 (W03)
        let mut records: Vec<_> = d(2021, 7, 19)
            .iter_days()
            .take(7)
            .map(|date| day(date, Some(100), Some(80.0)))
            .collect();
        records.push(day(d(2022, 1, 18), Some(900), Some(50.0)));

        let weeks = weekly_means(&records, d(2021, 7, 16));

        assert_eq!(weeks.len(), 2);
        assert!(weeks[0].aligned);
        assert_eq!(weeks[0].midweek, d(2021, 7, 22));
        assert_eq!(weeks[1].week_index, 2);
        assert_eq!(weeks[1].midweek, d(2021, 7, 29));
        assert!(!weeks[1].aligned);
    }

    #[test]
    fn test_contiguous_weeks_are_aligned() {
        let records: Vec<_> = d(2021, 12, 27)
            .iter_days()
            .take(21)
            .map(|date| day(date, Some(10), None))
            .collect();

        let weeks = weekly_means(&records, d(2021, 7, 16));

        assert_eq!(weeks.len(), 3);
        assert!(weeks.iter().all(|w| w.aligned));
    }

    #[test]
    fn test_empty_input() {
        assert!(weekly_means(&[], d(2021, 7, 16)).is_empty());
    }
}
