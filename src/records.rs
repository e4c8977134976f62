use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which input produced a reconciled day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    Summary,
    Bulletin,
    Correction,
}

/// One calendar day of the reconciled series.
///
/// `None` means unknown. The vaccinated share of hospitalizations is never
/// stored; it is derived from the unvaccinated share so the two always sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub origin: RecordOrigin,
    pub new_cases: Option<u32>,
    pub deaths: Option<u32>,
    pub hospitalized_total: Option<u32>,
    pub hospitalized_in_icu: Option<u32>,
    pub hospitalized_intubated: Option<u32>,
    pub hospitalized_severe: Option<u32>,
    pub hospitalized_from_bulletin: Option<u32>,
    pub pct_hospitalized_unvaccinated: Option<f64>,
}

impl DailyRecord {
    /// A day with every field unknown.
    pub fn empty(date: NaiveDate, origin: RecordOrigin) -> Self {
        DailyRecord {
            date,
            origin,
            new_cases: None,
            deaths: None,
            hospitalized_total: None,
            hospitalized_in_icu: None,
            hospitalized_intubated: None,
            hospitalized_severe: None,
            hospitalized_from_bulletin: None,
            pct_hospitalized_unvaccinated: None,
        }
    }

    /// Builds a day from a bulletin alone. Breakdown fields only the summary
    /// publishes (ICU, intubated, severe) stay unknown.
    pub fn from_bulletin(bulletin: &BulletinRecord, origin: RecordOrigin) -> Self {
        DailyRecord {
            new_cases: bulletin.new_cases,
            deaths: bulletin.deaths,
            hospitalized_total: bulletin.hospitalized,
            ..DailyRecord::empty(bulletin.date, origin)
        }
    }

    pub fn pct_hospitalized_vaccinated(&self) -> Option<f64> {
        self.pct_hospitalized_unvaccinated.map(|p| 100.0 - p)
    }

    pub fn hospitalized_unvaccinated(&self) -> Option<f64> {
        share_of(self.hospitalized_total, self.pct_hospitalized_unvaccinated)
    }

    pub fn hospitalized_vaccinated(&self) -> Option<f64> {
        share_of(self.hospitalized_total, self.pct_hospitalized_vaccinated())
    }

    pub fn hospitalized_not_in_icu(&self) -> Option<i64> {
        difference(self.hospitalized_total, self.hospitalized_in_icu)
    }

    pub fn hospitalized_in_icu_not_intubated(&self) -> Option<i64> {
        difference(self.hospitalized_in_icu, self.hospitalized_intubated)
    }
}

fn share_of(total: Option<u32>, pct: Option<f64>) -> Option<f64> {
    Some(f64::from(total?) * pct? / 100.0)
}

fn difference(a: Option<u32>, b: Option<u32>) -> Option<i64> {
    Some(i64::from(a?) - i64::from(b?))
}

/// The fields extracted from one dated press bulletin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletinRecord {
    pub date: NaiveDate,
    pub hospitalized: Option<u32>,
    pub pct_hospitalized_unvaccinated: Option<f64>,
    pub new_cases: Option<u32>,
    pub deaths: Option<u32>,
}

impl BulletinRecord {
    pub fn pct_hospitalized_vaccinated(&self) -> Option<f64> {
        self.pct_hospitalized_unvaccinated.map(|p| 100.0 - p)
    }
}

/// A row of the persisted extended daily dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedDailyRow {
    pub date: NaiveDate,
    pub source: RecordOrigin,
    pub new_cases: Option<u32>,
    pub deaths: Option<u32>,
    pub hospitalized_total: Option<u32>,
    pub hospitalized_in_icu: Option<u32>,
    pub hospitalized_intubated: Option<u32>,
    pub hospitalized_severe: Option<u32>,
    pub hospitalized_not_in_icu: Option<i64>,
    pub hospitalized_in_icu_not_intubated: Option<i64>,
    pub hospitalized_from_bulletin: Option<u32>,
    pub pct_hospitalized_unvaccinated: Option<f64>,
    pub pct_hospitalized_vaccinated: Option<f64>,
    pub hospitalized_unvaccinated: Option<f64>,
    pub hospitalized_vaccinated: Option<f64>,
}

impl From<&DailyRecord> for ExtendedDailyRow {
    fn from(r: &DailyRecord) -> Self {
        ExtendedDailyRow {
            date: r.date,
            source: r.origin,
            new_cases: r.new_cases,
            deaths: r.deaths,
            hospitalized_total: r.hospitalized_total,
            hospitalized_in_icu: r.hospitalized_in_icu,
            hospitalized_intubated: r.hospitalized_intubated,
            hospitalized_severe: r.hospitalized_severe,
            hospitalized_not_in_icu: r.hospitalized_not_in_icu(),
            hospitalized_in_icu_not_intubated: r.hospitalized_in_icu_not_intubated(),
            hospitalized_from_bulletin: r.hospitalized_from_bulletin,
            pct_hospitalized_unvaccinated: r.pct_hospitalized_unvaccinated,
            pct_hospitalized_vaccinated: r.pct_hospitalized_vaccinated(),
            hospitalized_unvaccinated: r.hospitalized_unvaccinated(),
            hospitalized_vaccinated: r.hospitalized_vaccinated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, 12).unwrap()
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let mut r = DailyRecord::empty(day(), RecordOrigin::Summary);
        r.pct_hospitalized_unvaccinated = Some(68.91);

        let total =
            r.pct_hospitalized_unvaccinated.unwrap() + r.pct_hospitalized_vaccinated().unwrap();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_hospitalized_split() {
        let mut r = DailyRecord::empty(day(), RecordOrigin::Summary);
        r.hospitalized_total = Some(200);
        r.pct_hospitalized_unvaccinated = Some(75.0);

        assert_eq!(r.hospitalized_unvaccinated(), Some(150.0));
        assert_eq!(r.hospitalized_vaccinated(), Some(50.0));
    }

    #[test]
    fn test_split_unknown_without_percentage() {
        let mut r = DailyRecord::empty(day(), RecordOrigin::Summary);
        r.hospitalized_total = Some(200);

        assert_eq!(r.hospitalized_unvaccinated(), None);
        assert_eq!(r.pct_hospitalized_vaccinated(), None);
    }

    #[test]
    fn test_severity_breakdown() {
        let mut r = DailyRecord::empty(day(), RecordOrigin::Summary);
        r.hospitalized_total = Some(120);
        r.hospitalized_in_icu = Some(30);
        r.hospitalized_intubated = Some(12);

        assert_eq!(r.hospitalized_not_in_icu(), Some(90));
        assert_eq!(r.hospitalized_in_icu_not_intubated(), Some(18));
    }

    #[test]
    fn test_from_bulletin_leaves_breakdown_unknown() {
        let b = BulletinRecord {
            date: day(),
            hospitalized: Some(238),
            pct_hospitalized_unvaccinated: Some(70.0),
            new_cases: Some(4000),
            deaths: Some(2),
        };
        let r = DailyRecord::from_bulletin(&b, RecordOrigin::Bulletin);

        assert_eq!(r.hospitalized_total, Some(238));
        assert_eq!(r.new_cases, Some(4000));
        assert_eq!(r.hospitalized_in_icu, None);
        assert_eq!(r.hospitalized_severe, None);
        // the percentage is attached separately during reconciliation
        assert_eq!(r.pct_hospitalized_unvaccinated, None);
    }
}
