//! End-to-end run: read sources, derive every table, then persist them.
//!
//! [`compute`] is pure. [`run`] only writes once every table has been
//! derived, so a failing run leaves the previous outputs untouched.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{BULLETIN_FILE, PipelineConfig, SUMMARY_FILE, VACCINATION_FILE};
use crate::corrections::CorrectionTable;
use crate::error::PipelineError;
use crate::output::stage_table;
use crate::reconcile::{BulletinUpdate, PreviousState, reconcile, update_bulletin_series};
use crate::records::{BulletinRecord, DailyRecord, ExtendedDailyRow};
use crate::sources::bulletin::{load_bulletins, save_bulletins};
use crate::sources::summary::load_summary;
use crate::sources::vaccination::{VaccinationDoseRecord, load_vaccination};
use crate::vaccination::{
    GroupStatusRow, VaccinationWeekSummary, normalize_vaccination, vaccination_status_by_group,
};
use crate::weekly::{WeeklyRateRecord, compute_weekly_rates};

pub const EXTENDED_DAILY_FILE: &str = "dataset_extended.csv";
pub const VACCINATION_WEEKLY_FILE: &str = "vaccination_weekly.csv";
pub const WEEKLY_RATES_FILE: &str = "hospitalization_rates_weekly.csv";
pub const STATUS_BY_GROUP_FILE: &str = "vaccination_by_age.csv";

/// Locations of the three raw inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub summary: PathBuf,
    pub bulletins: PathBuf,
    pub vaccination: PathBuf,
}

impl SourcePaths {
    /// The standard file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        SourcePaths {
            summary: dir.join(SUMMARY_FILE),
            bulletins: dir.join(BULLETIN_FILE),
            vaccination: dir.join(VACCINATION_FILE),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub summary: Vec<DailyRecord>,
    pub bulletins: Vec<BulletinRecord>,
    pub vaccination: Vec<VaccinationDoseRecord>,
}

#[derive(Debug, Clone)]
pub struct DerivedTables {
    pub daily: Vec<DailyRecord>,
    pub vaccination_weekly: Vec<VaccinationWeekSummary>,
    pub weekly_rates: Vec<WeeklyRateRecord>,
    pub status_by_group: Vec<GroupStatusRow>,
}

pub fn load_sources(paths: &SourcePaths, config: &PipelineConfig) -> Result<SourceTables> {
    Ok(SourceTables {
        summary: load_summary(&paths.summary)?,
        bulletins: load_bulletins(&paths.bulletins)?,
        vaccination: load_vaccination(&paths.vaccination, config.total_population)?,
    })
}

/// Derives all output tables from the raw sources.
///
/// The rate target group is required. Groups of the per-age status table are
/// optional: one without data is logged and left out.
#[tracing::instrument(skip_all)]
pub fn compute(
    sources: &SourceTables,
    corrections: &CorrectionTable,
    config: &PipelineConfig,
) -> Result<DerivedTables, PipelineError> {
    let daily = reconcile(
        &sources.summary,
        &sources.bulletins,
        corrections,
        config.bulletin_cutoff,
    )?;

    let vaccination_weekly = normalize_vaccination(
        &sources.vaccination,
        &[config.rate_target_group.as_str()],
        config.booster_policy,
    )?;

    let weekly_rates = compute_weekly_rates(&daily, &vaccination_weekly, config.bulletin_cutoff)?;

    let mut status_by_group = Vec::new();
    for group in &config.status_groups {
        let rows = vaccination_status_by_group(
            &sources.vaccination,
            &[group.as_str()],
            config.booster_policy,
        );
        match rows {
            Ok(rows) => status_by_group.extend(rows),
            Err(PipelineError::UnknownTargetGroup(g)) => {
                warn!(group = %g, "No vaccination data for group, leaving it out");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(DerivedTables {
        daily,
        vaccination_weekly,
        weekly_rates,
        status_by_group,
    })
}

/// Serializes every table before replacing any of them, so a failure while
/// writing one table leaves all previous outputs in place.
pub fn write_outputs(out_dir: &Path, tables: &DerivedTables) -> Result<()> {
    let extended: Vec<ExtendedDailyRow> = tables.daily.iter().map(ExtendedDailyRow::from).collect();

    let staged = [
        stage_table(&out_dir.join(EXTENDED_DAILY_FILE), &extended)?,
        stage_table(&out_dir.join(VACCINATION_WEEKLY_FILE), &tables.vaccination_weekly)?,
        stage_table(&out_dir.join(WEEKLY_RATES_FILE), &tables.weekly_rates)?,
        stage_table(&out_dir.join(STATUS_BY_GROUP_FILE), &tables.status_by_group)?,
    ];
    for file in staged {
        debug!(path = %file.path().display(), "Replacing output table");
        file.persist()?;
    }
    Ok(())
}

/// Reads the sources, derives every table and replaces the outputs in `out_dir`.
#[tracing::instrument(skip_all, fields(out_dir = %out_dir.display()))]
pub fn run(
    paths: &SourcePaths,
    out_dir: &Path,
    corrections: &CorrectionTable,
    config: &PipelineConfig,
) -> Result<DerivedTables> {
    let sources = load_sources(paths, config)?;
    info!(
        summary = sources.summary.len(),
        bulletins = sources.bulletins.len(),
        vaccination = sources.vaccination.len(),
        corrections_version = corrections.version,
        "Sources loaded"
    );

    let tables = compute(&sources, corrections, config).context("deriving tables")?;
    write_outputs(out_dir, &tables)?;

    info!(
        days = tables.daily.len(),
        first = ?tables.daily.first().map(|r| r.date),
        last = ?tables.daily.last().map(|r| r.date),
        weeks = tables.weekly_rates.len(),
        "Outputs written"
    );
    Ok(tables)
}

/// The stored bulletin series, or `None` when nothing has been stored yet.
pub fn load_previous_state(store: &Path) -> Result<Option<PreviousState>> {
    if !store.exists() {
        return Ok(None);
    }
    let bulletins = load_bulletins(store)?;
    Ok(Some(PreviousState { bulletins }))
}

/// Merges freshly extracted bulletin rows into the bulletin store at `store`.
#[tracing::instrument(skip_all, fields(extracted = %extracted.display(), store = %store.display()))]
pub fn ingest_bulletins(
    extracted: &Path,
    store: &Path,
    cutoff: chrono::NaiveDate,
) -> Result<BulletinUpdate> {
    let previous = load_previous_state(store)?;
    let fresh = load_bulletins(extracted)?;

    let update = update_bulletin_series(previous, fresh, cutoff);
    if update.added.is_empty() {
        info!("No new bulletin days");
    } else {
        save_bulletins(store, &update.series)?;
        info!(
            added = update.added.len(),
            last = ?update.series.last().map(|b| b.date),
            "Bulletin store updated"
        );
    }
    Ok(update)
}
