use chrono::NaiveDate;
use clap::Args;
use har_acquisition::acquisition::{parse_date as parse_iso_date, GapDetector, HarDownloadConfig, JsonFileLedger};
use har_acquisition::config::AppConfig;
use har_acquisition::error::AppError;
use har_acquisition::telemetry;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Source overrides shared by every subcommand; each falls back to the
/// `HAR_*` environment.
#[derive(Args, Debug, Default)]
pub(crate) struct SourceArgs {
    /// Planner config file (JSON)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,
    /// Listings export CSV
    #[arg(long, global = true)]
    pub(crate) listings_csv: Option<PathBuf>,
    /// Image status export CSV
    #[arg(long, global = true)]
    pub(crate) images_csv: Option<PathBuf>,
    /// Acquisition ledger file
    #[arg(long, global = true)]
    pub(crate) ledger: Option<PathBuf>,
    /// Tracing filter, e.g. `debug` or `har_acquisition=trace`
    #[arg(long, global = true)]
    pub(crate) log_level: Option<String>,
}

impl SourceArgs {
    pub(crate) fn load(self) -> Result<RunContext, AppError> {
        let mut config = AppConfig::load()?;
        if let Some(path) = self.config {
            config.sources.download_config = Some(path);
        }
        if let Some(path) = self.listings_csv {
            config.sources.listings_csv = path;
        }
        if let Some(path) = self.images_csv {
            config.sources.images_csv = Some(path);
        }
        if let Some(path) = self.ledger {
            config.sources.ledger_path = path;
        }
        if let Some(level) = self.log_level {
            config.telemetry.log_level = level;
        }

        telemetry::init(&config.telemetry)?;

        let download = match config.sources.download_config.as_deref() {
            Some(path) => HarDownloadConfig::from_path(path)?,
            None => HarDownloadConfig::default(),
        };
        debug!(
            environment = ?config.environment,
            listings_csv = %config.sources.listings_csv.display(),
            "configuration loaded"
        );

        Ok(RunContext { config, download })
    }
}

pub(crate) struct RunContext {
    pub(crate) config: AppConfig,
    pub(crate) download: HarDownloadConfig,
}

impl RunContext {
    pub(crate) fn detector(&self) -> GapDetector {
        GapDetector::new(
            self.config.sources.listings_csv.clone(),
            self.config.sources.images_csv.clone(),
        )
    }

    pub(crate) fn ledger(&self) -> JsonFileLedger {
        JsonFileLedger::new(self.config.sources.ledger_path.clone())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_iso_date(raw).map_err(|err| err.to_string())
}

/// Writes `value` to stdout as pretty JSON followed by a newline.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
