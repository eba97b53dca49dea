use super::records::{SourceSnapshot, UnsupportedStatus};
use super::thresholds::Thresholds;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Completeness of one day's acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayStatus {
    Complete,
    Partial,
    Missing,
}

impl DayStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "COMPLETE",
            Self::Partial => "PARTIAL",
            Self::Missing => "MISSING",
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayStatus {
    type Err = UnsupportedStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "COMPLETE" => Ok(Self::Complete),
            "PARTIAL" => Ok(Self::Partial),
            "MISSING" => Ok(Self::Missing),
            _ => Err(UnsupportedStatus(value.to_string())),
        }
    }
}

/// Classification result for a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyGapStatus {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub listings_count: usize,
    /// Only populated when image coverage was part of the check.
    pub images_count: Option<usize>,
}

/// Inclusive iterator over calendar days.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let mut cursor = Some(start);
    std::iter::from_fn(move || {
        let day = cursor.filter(|day| *day <= end)?;
        cursor = day.checked_add_days(Days::new(1));
        Some(day)
    })
}

pub struct GapClassifier<'a> {
    snapshot: &'a SourceSnapshot,
    thresholds: Option<&'a Thresholds>,
    images_required: bool,
}

impl<'a> GapClassifier<'a> {
    pub fn new(
        snapshot: &'a SourceSnapshot,
        thresholds: Option<&'a Thresholds>,
        images_required: bool,
    ) -> Self {
        Self {
            snapshot,
            thresholds,
            images_required,
        }
    }

    /// Raw volume only: no thresholds, no image lookups.
    pub fn presence_only(snapshot: &'a SourceSnapshot) -> Self {
        Self::new(snapshot, None, false)
    }

    pub fn classify(&self, day: NaiveDate) -> DailyGapStatus {
        let entries = self.snapshot.listings_on(day);
        let listings_count = entries.len();
        let images_count = self.images_required.then(|| {
            entries
                .iter()
                .filter(|record| self.snapshot.has_images(&record.identity()))
                .count()
        });

        DailyGapStatus {
            date: day,
            status: self.status_for(listings_count, images_count),
            listings_count,
            images_count,
        }
    }

    fn status_for(&self, listings_count: usize, images_count: Option<usize>) -> DayStatus {
        if listings_count == 0 {
            return DayStatus::Missing;
        }

        let mut status = DayStatus::Complete;

        if let Some(minimum) = self.thresholds.and_then(|t| t.listings_per_day) {
            if (listings_count as u64) < minimum {
                status = DayStatus::Partial;
            }
        }

        if let Some(images_count) = images_count {
            let ratio = images_count as f64 / listings_count as f64;
            match self.thresholds.and_then(|t| t.images_ratio) {
                Some(minimum) if ratio < minimum => status = DayStatus::Partial,
                // Listings with no photos at all never pass silently.
                None if images_count == 0 => status = DayStatus::Partial,
                _ => {}
            }
        }

        status
    }

    pub fn detect_gaps(&self, start: NaiveDate, end: NaiveDate) -> Vec<DailyGapStatus> {
        days_between(start, end).map(|day| self.classify(day)).collect()
    }
}
