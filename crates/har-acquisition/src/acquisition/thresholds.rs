use serde::Serialize;
use serde_json::{Map, Value};

/// Minimum acceptable acquisition for a single day. An absent field skips
/// that check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Thresholds {
    pub listings_per_day: Option<u64>,
    pub images_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("expected_min must be an object, got {0}")]
    NotAnObject(String),
    #[error("expected_min.listings_per_day must be a non-negative integer, got {0}")]
    ListingsPerDay(String),
    #[error("expected_min.images_ratio must be a number between 0 and 1, got {0}")]
    ImagesRatio(String),
}

impl Thresholds {
    /// Validates the loosely typed `expected_min` mapping.
    pub fn from_value(raw: &Value) -> Result<Self, ThresholdError> {
        match raw {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Self::from_map(map),
            other => Err(ThresholdError::NotAnObject(other.to_string())),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ThresholdError> {
        let listings_per_day = match map.get("listings_per_day") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                as_non_negative_integer(value)
                    .ok_or_else(|| ThresholdError::ListingsPerDay(value.to_string()))?,
            ),
        };

        let images_ratio = match map.get("images_ratio") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let ratio = as_float(value)
                    .filter(|ratio| (0.0..=1.0).contains(ratio))
                    .ok_or_else(|| ThresholdError::ImagesRatio(value.to_string()))?;
                Some(ratio)
            }
        };

        Ok(Self {
            listings_per_day,
            images_ratio,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.listings_per_day.is_none() && self.images_ratio.is_none()
    }
}

pub(crate) fn as_non_negative_integer(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0 && *float >= 0.0 && float.is_finite())
                .map(|float| float as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|float| float.is_finite())
}
