use crate::acquisition::{DownloadError, SettingsError, StatusError};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Settings(SettingsError),
    Planner(DownloadError),
    Ledger(StatusError),
    Output(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Settings(err) => write!(f, "download config error: {}", err),
            AppError::Planner(err) => write!(f, "planning error: {}", err),
            AppError::Ledger(err) => write!(f, "ledger error: {}", err),
            AppError::Output(err) => write!(f, "output error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Settings(err) => Some(err),
            AppError::Planner(err) => Some(err),
            AppError::Ledger(err) => Some(err),
            AppError::Output(err) => Some(err),
        }
    }
}

impl AppError {
    /// Process exit code: 2 for configuration problems, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Settings(_) => 2,
            AppError::Planner(DownloadError::InvalidDate { .. })
            | AppError::Planner(DownloadError::InvertedRange { .. })
            | AppError::Ledger(StatusError::UnsupportedStatus(_)) => 2,
            _ => 1,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SettingsError> for AppError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

impl From<DownloadError> for AppError {
    fn from(value: DownloadError) -> Self {
        Self::Planner(value)
    }
}

impl From<StatusError> for AppError {
    fn from(value: StatusError) -> Self {
        Self::Ledger(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::records::UnsupportedStatus;

    #[test]
    fn configuration_problems_exit_with_two() {
        let err = AppError::from(StatusError::from(UnsupportedStatus("DONE".to_string())));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "ledger error: unsupported status: DONE");

        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.exit_code(), 1);
    }
}
