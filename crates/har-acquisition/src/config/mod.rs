use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    /// Filter used when `HAR_LOG_LEVEL` is unset.
    pub fn default_log_level(self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Test => "warn",
            Self::Production => "info",
        }
    }
}

/// Top-level process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub sources: SourceConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("HAR_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let listings_csv = non_empty_var("HAR_LISTINGS_CSV")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/har_listings.csv"));
        let images_csv = non_empty_var("HAR_IMAGES_CSV")?.map(PathBuf::from);
        let download_config = non_empty_var("HAR_DOWNLOAD_CONFIG")?.map(PathBuf::from);
        let ledger_path = non_empty_var("HAR_LEDGER_PATH")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/acq_ledger.json"));

        let log_level = non_empty_var("HAR_LOG_LEVEL")?
            .unwrap_or_else(|| environment.default_log_level().to_string());

        Ok(Self {
            environment,
            sources: SourceConfig {
                listings_csv,
                images_csv,
                download_config,
                ledger_path,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn non_empty_var(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { key }),
    }
}

/// Locations of the exports and ledger the planner works against.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub listings_csv: PathBuf,
    pub images_csv: Option<PathBuf>,
    pub download_config: Option<PathBuf>,
    pub ledger_path: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    NotUnicode { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotUnicode { key } => write!(f, "{key} must be valid unicode"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("HAR_ENV");
        env::remove_var("HAR_LISTINGS_CSV");
        env::remove_var("HAR_IMAGES_CSV");
        env::remove_var("HAR_DOWNLOAD_CONFIG");
        env::remove_var("HAR_LEDGER_PATH");
        env::remove_var("HAR_LOG_LEVEL");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(
            config.sources.listings_csv,
            PathBuf::from("data/har_listings.csv")
        );
        assert!(config.sources.images_csv.is_none());
        assert!(config.sources.download_config.is_none());
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn blank_paths_are_treated_as_unset() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HAR_ENV", "ci");
        env::set_var("HAR_IMAGES_CSV", "   ");
        env::set_var("HAR_LEDGER_PATH", "/tmp/ledger.json");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.telemetry.log_level, "warn");
        assert!(config.sources.images_csv.is_none());
        assert_eq!(
            config.sources.ledger_path,
            PathBuf::from("/tmp/ledger.json")
        );
        reset_env();
    }

    #[test]
    fn environment_picks_default_log_level_unless_overridden() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HAR_ENV", "production");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.telemetry.log_level, "info");

        env::set_var("HAR_LOG_LEVEL", "har_acquisition=trace");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.telemetry.log_level, "har_acquisition=trace");
        reset_env();
    }
}
