//! CLI entry point for the Cyprus COVID-19 hospitalization rates pipeline.
//!
//! Provides subcommands for downloading the government sources, merging newly
//! extracted bulletin rows, running the full pipeline and showing the active
//! correction table.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use covid_cy_rates::{
    config::{
        self, DEFAULT_BULLETIN_CUTOFF, DEFAULT_SUMMARY_URL, DEFAULT_TOTAL_POPULATION,
        DEFAULT_VACCINATION_URL, PipelineConfig, SUMMARY_FILE, VACCINATION_FILE,
    },
    corrections::CorrectionTable,
    fetch::{BasicClient, download_to},
    output::print_json,
    pipeline::{self, SourcePaths},
    vaccination::{ADULT_AGGREGATE_GROUP, BoosterPolicy},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "covid_cy_rates")]
#[command(
    about = "Reconciles Cyprus COVID-19 data and derives hospitalization rates",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the summary and vaccination CSVs into the data directory
    Fetch {
        #[arg(short, long, env = "COVID_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        #[arg(long, env = "COVID_SUMMARY_URL", default_value = DEFAULT_SUMMARY_URL)]
        summary_url: String,

        #[arg(long, env = "COVID_VACCINATION_URL", default_value = DEFAULT_VACCINATION_URL)]
        vaccination_url: String,
    },
    /// Merge bulletin rows produced by the PDF extractor into the bulletin store
    IngestBulletins {
        /// CSV written by the extractor
        #[arg(value_name = "EXTRACTED_CSV")]
        extracted: PathBuf,

        #[arg(short, long, env = "COVID_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        #[arg(long, env = "COVID_BULLETIN_CUTOFF", default_value = DEFAULT_BULLETIN_CUTOFF)]
        cutoff: NaiveDate,
    },
    /// Reconcile the sources and write every derived table
    Run {
        #[arg(short, long, env = "COVID_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        #[arg(short, long, env = "COVID_OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,

        #[command(flatten)]
        params: RunParams,
    },
    /// Print the active correction table as JSON
    Corrections {
        #[arg(long, env = "COVID_CORRECTIONS")]
        corrections: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunParams {
    /// Correction table replacing the built-in one
    #[arg(long, env = "COVID_CORRECTIONS")]
    corrections: Option<PathBuf>,

    #[arg(long, env = "COVID_BULLETIN_CUTOFF", default_value = DEFAULT_BULLETIN_CUTOFF)]
    cutoff: NaiveDate,

    #[arg(long, env = "COVID_TOTAL_POPULATION", default_value_t = DEFAULT_TOTAL_POPULATION)]
    total_population: u64,

    /// Vaccination group normalizing the hospitalization rates
    #[arg(long, env = "COVID_TARGET_GROUP", default_value = ADULT_AGGREGATE_GROUP)]
    target_group: String,

    #[arg(
        long,
        env = "COVID_BOOSTER_POLICY",
        value_enum,
        default_value_t = BoosterPolicy::default()
    )]
    booster_policy: BoosterPolicy,

    /// Groups of the per-age status table (defaults to every standard group)
    #[arg(long, env = "COVID_STATUS_GROUPS", value_delimiter = ',')]
    status_groups: Vec<String>,
}

impl RunParams {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig {
            bulletin_cutoff: self.cutoff,
            rate_target_group: self.target_group,
            total_population: self.total_population,
            booster_policy: self.booster_policy,
            ..PipelineConfig::default()
        };
        if !self.status_groups.is_empty() {
            config.status_groups = self.status_groups;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/covid_cy_rates.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("covid_cy_rates.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            data_dir,
            summary_url,
            vaccination_url,
        } => {
            fetch_sources(&data_dir, &summary_url, &vaccination_url).await?;
        }
        Commands::IngestBulletins {
            extracted,
            data_dir,
            cutoff,
        } => {
            let store = SourcePaths::in_dir(&data_dir).bulletins;
            let update = pipeline::ingest_bulletins(&extracted, &store, cutoff)?;
            for date in &update.added {
                info!(%date, "New bulletin day");
            }
        }
        Commands::Run {
            data_dir,
            output_dir,
            params,
        } => {
            let corrections = load_corrections(params.corrections.as_deref())?;
            let config = params.into_config();
            info!(
                target_group = %config.rate_target_group,
                cutoff = %config.bulletin_cutoff,
                booster_policy = ?config.booster_policy,
                "Starting pipeline run"
            );

            let paths = SourcePaths::in_dir(&data_dir);
            if let Err(e) = pipeline::run(&paths, &output_dir, &corrections, &config) {
                error!(error = %e, "Pipeline run failed, previous outputs kept");
                return Err(e);
            }
        }
        Commands::Corrections { corrections } => {
            let table = load_corrections(corrections.as_deref())?;
            print_json(&table)?;
        }
    }

    Ok(())
}

/// The correction table at `path`, or the built-in one.
fn load_corrections(path: Option<&Path>) -> Result<CorrectionTable> {
    let table = match path {
        Some(p) => CorrectionTable::load(p)?,
        None => CorrectionTable::builtin()?,
    };
    info!(
        version = table.version,
        overrides = table.overrides.len(),
        synthetic_bulletins = table.synthetic_bulletins.len(),
        "Correction table loaded"
    );
    Ok(table)
}

/// Downloads both government CSVs concurrently. Each file is replaced only
/// when its own download succeeds.
#[tracing::instrument(fields(data_dir = %data_dir.display()))]
async fn fetch_sources(data_dir: &Path, summary_url: &str, vaccination_url: &str) -> Result<()> {
    let client = BasicClient::new()?;
    let summary_path = data_dir.join(SUMMARY_FILE);
    let vaccination_path = data_dir.join(VACCINATION_FILE);

    let (summary, vaccination) = tokio::join!(
        download_to(&client, summary_url, &summary_path),
        download_to(&client, vaccination_url, &vaccination_path),
    );

    let mut failed = 0;
    for (name, result) in [("summary", summary), ("vaccination", vaccination)] {
        if let Err(e) = result {
            error!(source = name, error = %e, "Download failed, keeping stored file");
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} source download(s) failed");
    }

    info!(
        bulletin_store = %data_dir.join(config::BULLETIN_FILE).display(),
        "Sources refreshed; bulletins are added with ingest-bulletins"
    );
    Ok(())
}
