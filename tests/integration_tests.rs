use covid_cy_rates::config::PipelineConfig;
use covid_cy_rates::corrections::CorrectionTable;
use covid_cy_rates::pipeline::{
    self, EXTENDED_DAILY_FILE, STATUS_BY_GROUP_FILE, SourcePaths, VACCINATION_WEEKLY_FILE,
    WEEKLY_RATES_FILE,
};
use covid_cy_rates::records::RecordOrigin;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

fn fixtures() -> SourcePaths {
    SourcePaths::in_dir(&Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"))
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn no_corrections() -> CorrectionTable {
    CorrectionTable {
        version: 1,
        ..CorrectionTable::default()
    }
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("value should be known");
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

#[test]
fn test_full_pipeline() {
    let out = tempfile::tempdir().unwrap();
    let tables = pipeline::run(
        &fixtures(),
        out.path(),
        &no_corrections(),
        &PipelineConfig::default(),
    )
    .expect("pipeline run");

    // summary covers one week, bulletins extend it by another; the pre-cutoff bulletin is ignored
    assert_eq!(tables.daily.len(), 14);
    assert_eq!(tables.daily.first().unwrap().date, d(2021, 7, 19));
    assert_eq!(tables.daily.last().unwrap().date, d(2021, 8, 1));

    let first = &tables.daily[0];
    assert_eq!(first.origin, RecordOrigin::Summary);
    assert_eq!(first.hospitalized_total, Some(100));
    assert_eq!(first.hospitalized_from_bulletin, Some(100));
    assert_eq!(first.pct_hospitalized_unvaccinated, Some(80.0));
    assert_eq!(tables.daily[2].deaths, None);

    let appended = &tables.daily[7];
    assert_eq!(appended.origin, RecordOrigin::Bulletin);
    assert_eq!(appended.hospitalized_total, Some(50));
    assert_eq!(appended.pct_hospitalized_unvaccinated, Some(60.0));

    assert_eq!(tables.vaccination_weekly.len(), 2);
    assert_eq!(tables.vaccination_weekly[0].target_group, "Age18+");
    assert_eq!(tables.vaccination_weekly[0].denominator, 500_000);
    assert_eq!(tables.vaccination_weekly[1].completing_scheme_cumsum, 450_000);
    assert_eq!(tables.vaccination_weekly[1].completing_scheme_pct, Some(90.0));

    let rates = &tables.weekly_rates;
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0].midweek, d(2021, 7, 22));
    assert_eq!(rates[0].week_index, 1);
    assert_close(rates[0].rate_vaccinated_per_100k, 5.0);
    assert_close(rates[0].rate_unvaccinated_per_100k, 80.0);
    assert_close(rates[0].ratio, 16.0);

    assert_eq!(rates[1].midweek, d(2021, 7, 29));
    assert_close(rates[1].rate_unvaccinated_per_100k, 60.0);
    assert_close(rates[1].rate_vaccinated_per_100k, 20.0 * 100_000.0 / 450_000.0);
    assert_close(rates[1].ratio, 13.5);

    // groups without data are left out of the status table
    let groups: Vec<&str> = tables
        .status_by_group
        .iter()
        .map(|r| r.target_group.as_str())
        .collect();
    assert_eq!(groups.len(), 16);
    assert_eq!(groups[0], "ALL");
    assert_eq!(groups[4], "Age18+");

    let all = &tables.status_by_group[..4];
    assert_eq!(all[0].label, "All ages");
    assert_eq!(all[0].people, 5_200);
    assert_eq!(all[1].people, 451_000);
    assert_eq!(all[3].people, 249_000);
    assert_eq!(all.iter().map(|r| r.band).sum::<i64>(), 700_000);

    for file in [
        EXTENDED_DAILY_FILE,
        VACCINATION_WEEKLY_FILE,
        WEEKLY_RATES_FILE,
        STATUS_BY_GROUP_FILE,
    ] {
        assert!(out.path().join(file).exists(), "{file} missing");
    }
}

#[test]
fn test_extended_dataset_columns() {
    let out = tempfile::tempdir().unwrap();
    pipeline::run(
        &fixtures(),
        out.path(),
        &no_corrections(),
        &PipelineConfig::default(),
    )
    .unwrap();

    let mut rdr = csv::Reader::from_path(out.path().join(EXTENDED_DAILY_FILE)).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "date");
    assert_eq!(&headers[1], "source");
    assert!(headers.iter().any(|h| h == "hospitalized_not_in_icu"));
    assert!(headers.iter().any(|h| h == "pct_hospitalized_vaccinated"));

    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 14);
    assert_eq!(&rows[0][0], "2021-07-19");
    assert_eq!(&rows[0][1], "summary");
    assert_eq!(&rows[13][1], "bulletin");

    let not_in_icu = headers.iter().position(|h| h == "hospitalized_not_in_icu").unwrap();
    assert_eq!(&rows[0][not_in_icu], "88");
}

#[test]
fn test_builtin_corrections_apply() {
    let out = tempfile::tempdir().unwrap();
    let corrections = CorrectionTable::builtin().unwrap();
    let tables = pipeline::run(&fixtures(), out.path(), &corrections, &PipelineConfig::default())
        .unwrap();

    let synthetic = tables
        .daily
        .iter()
        .find(|r| r.date == d(2021, 12, 5))
        .expect("synthetic day inserted");
    assert_eq!(synthetic.origin, RecordOrigin::Correction);
    assert_eq!(synthetic.hospitalized_total, Some(119));
    assert_eq!(synthetic.pct_hospitalized_unvaccinated, Some(68.91));

    let overridden = tables
        .daily
        .iter()
        .find(|r| r.date == d(2022, 1, 18))
        .expect("override day inserted");
    assert_eq!(overridden.deaths, Some(5));
    assert_eq!(overridden.hospitalized_total, None);

    let dates: Vec<NaiveDate> = tables.daily.iter().map(|r| r.date).collect();
    assert!(dates.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_failed_run_keeps_previous_outputs() {
    let out = tempfile::tempdir().unwrap();
    let previous = out.path().join(WEEKLY_RATES_FILE);
    fs::write(&previous, "midweek\n2021-07-15\n").unwrap();

    let config = PipelineConfig {
        rate_target_group: "Age5_11".to_string(),
        ..PipelineConfig::default()
    };
    let err = pipeline::run(&fixtures(), out.path(), &no_corrections(), &config).unwrap_err();

    assert!(format!("{err:#}").contains("Age5_11"));
    assert_eq!(fs::read_to_string(&previous).unwrap(), "midweek\n2021-07-15\n");
    assert!(!out.path().join(EXTENDED_DAILY_FILE).exists());
}

#[test]
fn test_rerun_is_deterministic() {
    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default();

    pipeline::run(&fixtures(), out.path(), &no_corrections(), &config).unwrap();
    let first = fs::read(out.path().join(WEEKLY_RATES_FILE)).unwrap();
    pipeline::run(&fixtures(), out.path(), &no_corrections(), &config).unwrap();
    let second = fs::read(out.path().join(WEEKLY_RATES_FILE)).unwrap();

    assert_eq!(first, second);
}
