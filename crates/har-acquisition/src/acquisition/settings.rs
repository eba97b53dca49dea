use super::thresholds::{as_non_negative_integer, ThresholdError, Thresholds};
use super::zip_gaps::ZipFilter;
use serde_json::{Map, Value};
use std::path::Path;

pub const MAX_LISTINGS_PER_RUN: &str = "max_listings_per_run";
pub const MAX_IMAGES_LISTINGS_BATCH: &str = "max_images_listings_batch";

const DEFAULT_MAX_LISTINGS_PER_RUN: usize = 5000;
const DEFAULT_MAX_IMAGES_LISTINGS_BATCH: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read download config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("download config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("download config must be a JSON object")]
    NotAnObject,
    #[error("`{0}` must be an object")]
    SectionNotAnObject(&'static str),
    #[error("unknown limit `{0}`")]
    UnknownLimit(String),
    #[error("limit `{name}` must be a non-negative integer, got {value}")]
    InvalidLimit { name: String, value: String },
    #[error("limit `{0}` must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("images.enabled must be a boolean, got {0}")]
    InvalidImagesEnabled(String),
    #[error("images.zip_filters must be a list of strings or \"all\", got {0}")]
    InvalidZipFilters(String),
    #[error(transparent)]
    Thresholds(#[from] ThresholdError),
}

/// Named budgets bounding a single acquisition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_listings_per_run: usize,
    pub max_images_listings_batch: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_listings_per_run: DEFAULT_MAX_LISTINGS_PER_RUN,
            max_images_listings_batch: DEFAULT_MAX_IMAGES_LISTINGS_BATCH,
        }
    }
}

impl Limits {
    fn from_map(map: &Map<String, Value>) -> Result<Self, SettingsError> {
        let mut limits = Self::default();

        for (name, value) in map {
            let parsed = as_non_negative_integer(value)
                .and_then(|parsed| usize::try_from(parsed).ok())
                .ok_or_else(|| SettingsError::InvalidLimit {
                    name: name.clone(),
                    value: value.to_string(),
                })?;

            match name.as_str() {
                MAX_LISTINGS_PER_RUN => limits.max_listings_per_run = parsed,
                MAX_IMAGES_LISTINGS_BATCH => limits.max_images_listings_batch = parsed,
                other => return Err(SettingsError::UnknownLimit(other.to_string())),
            }
        }

        if limits.max_listings_per_run == 0 {
            return Err(SettingsError::ZeroLimit(MAX_LISTINGS_PER_RUN));
        }
        if limits.max_images_listings_batch == 0 {
            return Err(SettingsError::ZeroLimit(MAX_IMAGES_LISTINGS_BATCH));
        }

        Ok(limits)
    }
}

/// Validated planner configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HarDownloadConfig {
    pub limits: Limits,
    pub expected_min: Option<Thresholds>,
    pub images_enabled: bool,
    pub zip_filters: ZipFilter,
}

impl Default for HarDownloadConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            expected_min: None,
            images_enabled: true,
            zip_filters: ZipFilter::All,
        }
    }
}

impl HarDownloadConfig {
    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SettingsError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    /// Validates the loosely typed mapping, rejecting anything that could
    /// silently change a budget.
    pub fn from_value(raw: &Value) -> Result<Self, SettingsError> {
        let root = raw.as_object().ok_or(SettingsError::NotAnObject)?;
        let mut config = Self::default();

        match root.get("limits") {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => config.limits = Limits::from_map(map)?,
            Some(_) => return Err(SettingsError::SectionNotAnObject("limits")),
        }

        match root.get("expected_min") {
            None | Some(Value::Null) => {}
            Some(value) => config.expected_min = Some(Thresholds::from_value(value)?),
        }

        match root.get("images") {
            None | Some(Value::Null) => {}
            Some(Value::Object(images)) => {
                config.images_enabled = match images.get("enabled") {
                    None | Some(Value::Null) => true,
                    Some(Value::Bool(enabled)) => *enabled,
                    Some(other) => {
                        return Err(SettingsError::InvalidImagesEnabled(other.to_string()))
                    }
                };
                config.zip_filters = parse_zip_filters(images.get("zip_filters"))?;
            }
            Some(_) => return Err(SettingsError::SectionNotAnObject("images")),
        }

        Ok(config)
    }
}

fn parse_zip_filters(raw: Option<&Value>) -> Result<ZipFilter, SettingsError> {
    match raw {
        None | Some(Value::Null) => Ok(ZipFilter::All),
        Some(Value::String(code)) => Ok(ZipFilter::from_codes([code])),
        Some(Value::Array(items)) => {
            let codes = items
                .iter()
                .map(|item| match item {
                    Value::String(code) => Ok(code.clone()),
                    Value::Number(number) => Ok(number.to_string()),
                    other => Err(SettingsError::InvalidZipFilters(other.to_string())),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ZipFilter::from_codes(codes))
        }
        Some(other) => Err(SettingsError::InvalidZipFilters(other.to_string())),
    }
}
