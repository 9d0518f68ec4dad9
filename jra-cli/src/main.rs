//! JRA collector CLI: collect per-year CSV files for a year range, then
//! rebuild the `data_summary.json` manifest from what is on disk.
//!
//! Exit codes: 0 on success, 1 on invalid arguments or any failed cell,
//! 130 when interrupted with Ctrl-C.

mod logging;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jra_core::data::{CollectorSet, Fetch, LogProgress, OfflineFetcher, RateLimitedFetcher, Throttle};
use jra_core::{
    CategoryKind, CollectError, CollectionConfig, CollectionOrchestrator, CollectionReport,
    FailurePolicy, Settings, DATA_START_YEAR,
};

const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "jra-collect",
    about = "Collect JRA horse racing data into per-year CSV files"
)]
struct Cli {
    /// Starting year for data collection (default: 1986).
    #[arg(long)]
    start_year: Option<i32>,

    /// Ending year for data collection (default: current year).
    #[arg(long)]
    end_year: Option<i32>,

    /// Data types to collect (default: all).
    #[arg(long, value_enum, num_args = 1..)]
    data_types: Vec<DataType>,

    /// Directory the CSV files and manifest are written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Manifest path. Defaults to `<output-dir>/data_summary.json`.
    #[arg(long)]
    summary_path: Option<PathBuf>,

    /// Collect without writing CSV files.
    #[arg(long, default_value_t = false)]
    no_save: bool,

    /// What to do when a cell fails to fetch.
    #[arg(long, value_enum)]
    on_error: Option<OnError>,

    /// Number of years collected concurrently.
    #[arg(long)]
    workers: Option<usize>,

    /// Fetch from `API_URL` over HTTP. Without it no requests are sent and
    /// every cell is written as an empty table.
    #[arg(long, default_value_t = false)]
    online: bool,

    /// Path to a TOML collection config. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DataType {
    #[value(name = "race_calendar")]
    RaceCalendar,
    #[value(name = "race_results")]
    RaceResults,
    #[value(name = "horse_data")]
    HorseData,
    #[value(name = "track_condition")]
    TrackCondition,
}

impl From<DataType> for CategoryKind {
    fn from(value: DataType) -> Self {
        match value {
            DataType::RaceCalendar => CategoryKind::RaceCalendar,
            DataType::RaceResults => CategoryKind::RaceResults,
            DataType::HorseData => CategoryKind::HorseData,
            DataType::TrackCondition => CategoryKind::TrackCondition,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OnError {
    Abort,
    Skip,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Abort => FailurePolicy::Abort,
            OnError::Skip => FailurePolicy::Skip,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = run(cli);
    match &result {
        Ok(report) if !report.all_succeeded() => {
            for cell in &report.skipped {
                tracing::error!(category = %cell.category, year = cell.year, "{}", cell.error);
            }
            eprintln!("error: {} of {} cells failed", report.failed(), report.total);
        }
        Ok(_) => tracing::info!("JRA data collection completed successfully"),
        Err(e) if is_interrupted(e) => eprintln!("interrupted"),
        Err(e) => eprintln!("error: {e:#}"),
    }
    ExitCode::from(exit_status(&result))
}

/// 0 when every cell succeeded, 130 on interrupt, 1 otherwise.
fn exit_status(result: &Result<CollectionReport>) -> u8 {
    match result {
        Ok(report) if report.all_succeeded() => 0,
        Ok(_) => EXIT_FAILURE,
        Err(e) if is_interrupted(e) => EXIT_INTERRUPTED,
        Err(_) => EXIT_FAILURE,
    }
}

fn is_interrupted(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<CollectError>(), Some(CollectError::Interrupted))
}

fn run(cli: Cli) -> Result<CollectionReport> {
    let settings = Settings::from_env().context("invalid environment settings")?;
    logging::init_tracing(&settings.log_filter(), cli.log_json);

    let config = build_config(&cli, &settings, chrono::Local::now().year())?;
    config.validate()?;

    let fetcher = build_fetcher(&config, &settings, cli.online)?;
    let orchestrator =
        CollectionOrchestrator::new(config, CollectorSet::new(fetcher, &settings.api_url))?;

    let cancel = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(Arc::clone(&cancel))?;

    let categories = &orchestrator.config().categories;
    let names: Vec<&str> = categories.iter().map(|c| c.prefix()).collect();
    tracing::info!("Data types to collect: {}", names.join(", "));

    let report = orchestrator.collect_all(categories, &LogProgress, Some(&cancel))?;
    orchestrator.export_summary(cli.summary_path.as_deref())?;
    Ok(report)
}

/// Layer flags over the TOML file (when given) over environment settings.
fn build_config(cli: &Cli, settings: &Settings, current_year: i32) -> Result<CollectionConfig> {
    let mut config = match &cli.config {
        Some(path) => CollectionConfig::from_file_with_settings(path, settings)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CollectionConfig::new(DATA_START_YEAR, current_year).with_settings(settings),
    };

    if let Some(year) = cli.start_year {
        config.start_year = year;
    }
    if let Some(year) = cli.end_year {
        config.end_year = year;
    }
    if !cli.data_types.is_empty() {
        config = config.with_categories(cli.data_types.iter().copied().map(CategoryKind::from));
    }
    if let Some(dir) = &cli.output_dir {
        config = config.with_output_dir(dir);
    }
    if cli.no_save {
        config.persist = false;
    }
    if let Some(policy) = cli.on_error {
        config.failure_policy = policy.into();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    Ok(config)
}

fn build_fetcher(
    config: &CollectionConfig,
    settings: &Settings,
    online: bool,
) -> Result<Arc<dyn Fetch>> {
    if !online {
        tracing::info!("offline mode: no requests will be sent (pass --online to fetch)");
        return Ok(Arc::new(OfflineFetcher));
    }
    let throttle = Arc::new(Throttle::new(
        config.request_delay_base,
        config.request_delay_jitter,
    ));
    let fetcher =
        RateLimitedFetcher::new(throttle, config.request_timeout(), &settings.api_key)?;
    Ok(Arc::new(fetcher))
}

/// First Ctrl-C asks the run to stop after the current cell; a second one exits.
fn install_interrupt_handler(cancel: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        if cancel.swap(true, Ordering::SeqCst) {
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
        eprintln!("stopping after the current cell (Ctrl-C again to quit now)");
    })
    .context("failed to install Ctrl-C handler")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["jra-collect"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_cover_every_category_from_1986() {
        let cli = parse(&[]);
        let config = build_config(&cli, &Settings::default(), 2024).unwrap();

        assert_eq!(config.start_year, 1986);
        assert_eq!(config.end_year, 2024);
        assert_eq!(config.categories.len(), 4);
        assert!(config.persist);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn data_types_take_several_values() {
        let cli = parse(&["--data-types", "race_results", "horse_data"]);
        let config = build_config(&cli, &Settings::default(), 2024).unwrap();

        let cats: Vec<CategoryKind> = config.categories.iter().copied().collect();
        assert_eq!(cats, vec![CategoryKind::RaceResults, CategoryKind::HorseData]);
    }

    #[test]
    fn unknown_data_type_is_rejected() {
        let result = Cli::try_parse_from(["jra-collect", "--data-types", "odds_history"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_environment() {
        let settings = Settings {
            data_dir: PathBuf::from("env-data"),
            request_delay: 3.0,
            ..Settings::default()
        };
        let cli = parse(&[
            "--start-year",
            "2020",
            "--end-year",
            "2021",
            "--output-dir",
            "flag-data",
            "--no-save",
            "--on-error",
            "skip",
            "--workers",
            "4",
        ]);
        let config = build_config(&cli, &settings, 2024).unwrap();

        assert_eq!(config.start_year, 2020);
        assert_eq!(config.end_year, 2021);
        assert_eq!(config.output_dir, PathBuf::from("flag-data"));
        assert_eq!(config.request_delay_base, 3.0);
        assert!(!config.persist);
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "start_year = 1990\nend_year = 1995\nworkers = 2\ncategories = [\"track_condition\"]"
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cli = parse(&["--config", &path, "--end-year", "1992"]);
        let config = build_config(&cli, &Settings::default(), 2024).unwrap();

        assert_eq!(config.start_year, 1990);
        assert_eq!(config.end_year, 1992);
        assert_eq!(config.workers, 2);
        assert_eq!(
            config.categories.iter().copied().collect::<Vec<_>>(),
            vec![CategoryKind::TrackCondition]
        );
    }

    #[test]
    fn start_year_before_1986_fails_validation() {
        let cli = parse(&["--start-year", "1985"]);
        let config = build_config(&cli, &Settings::default(), 2024).unwrap();
        assert!(matches!(config.validate(), Err(CollectError::Validation(_))));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = parse(&["--config", "/nonexistent/jra.toml"]);
        assert!(build_config(&cli, &Settings::default(), 2024).is_err());
    }

    #[test]
    fn fetch_mode_is_offline_unless_requested() {
        let config = CollectionConfig::new(2020, 2020);

        let cli = parse(&[]);
        let fetcher = build_fetcher(&config, &Settings::default(), cli.online).unwrap();
        assert_eq!(fetcher.name(), "offline");

        let cli = parse(&["--online"]);
        let fetcher = build_fetcher(&config, &Settings::default(), cli.online).unwrap();
        assert_eq!(fetcher.name(), "http");
    }

    #[test]
    fn default_run_collects_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_string_lossy().to_string();
        let cli = parse(&[
            "--start-year",
            "2020",
            "--end-year",
            "2020",
            "--data-types",
            "race_results",
            "--output-dir",
            &out,
        ]);
        let settings = Settings::default();
        let config = build_config(&cli, &settings, 2024).unwrap();
        let fetcher = build_fetcher(&config, &settings, cli.online).unwrap();
        let orch =
            CollectionOrchestrator::new(config, CollectorSet::new(fetcher, &settings.api_url))
                .unwrap();

        let (report, manifest) = orch.run(&LogProgress, None).unwrap();

        assert_eq!(exit_status(&Ok(report)), 0);
        assert!(dir.path().join("race_results_2020.csv").exists());
        assert_eq!(manifest.years("race_results").unwrap(), &["2020".to_string()]);
    }

    fn report(total: usize, failed: &[(CategoryKind, i32)]) -> CollectionReport {
        CollectionReport {
            data: Default::default(),
            skipped: failed
                .iter()
                .map(|&(category, year)| jra_core::SkippedCell {
                    category,
                    year,
                    error: "transport error".into(),
                })
                .collect(),
            total,
        }
    }

    #[test]
    fn exit_status_mapping() {
        assert_eq!(exit_status(&Ok(report(4, &[]))), 0);
        assert_eq!(
            exit_status(&Ok(report(4, &[(CategoryKind::HorseData, 2020)]))),
            1
        );
        assert_eq!(
            exit_status(&Err(CollectError::Interrupted.into())),
            130
        );
        assert_eq!(
            exit_status(&Err(
                anyhow::Error::from(CollectError::Interrupted).context("collection stopped")
            )),
            130
        );
        let validation = CollectionConfig::new(1985, 2020).validate().unwrap_err();
        assert_eq!(exit_status(&Err(validation.into())), 1);
        assert_eq!(exit_status(&Err(anyhow::anyhow!("disk on fire"))), 1);
    }
}
