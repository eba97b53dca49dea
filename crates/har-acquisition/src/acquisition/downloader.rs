use super::batches::{plan_image_batches, ImageBatches};
use super::classifier::{DailyGapStatus, DayStatus, GapClassifier};
use super::ledger::{StatusError, StatusUpdater};
use super::records::{parse_timestamp, GapDetector, ReaderError, SourceSnapshot};
use super::settings::HarDownloadConfig;
use super::thresholds::Thresholds;
use super::windows::{partition_date_range, DateWindow};
use super::zip_gaps::{missing_by_zip, missing_by_zip_view, ZipFilter, ZipGapView};
use chrono::{Days, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Days looked back when a request leaves one end of the range open.
pub const DEFAULT_LOOKBACK_DAYS: u64 = 14;

pub const TODAY_PARTIAL_NOTE: &str = "Marked partial via --today";

/// Hours behind UTC of the fixed clock that defines "today".
const REFERENCE_UTC_OFFSET_HOURS: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },
    #[error("since {since} is after until {until}")]
    InvertedRange { since: NaiveDate, until: NaiveDate },
    #[error(transparent)]
    Source(#[from] ReaderError),
    #[error("status update failed: {0}")]
    Status(#[from] StatusError),
}

/// Current calendar date on the fixed UTC-5 reference clock, independent of
/// the machine's local zone.
pub fn reference_today() -> NaiveDate {
    (Utc::now().naive_utc() - Duration::hours(REFERENCE_UTC_OFFSET_HOURS)).date()
}

pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

fn days_before(day: NaiveDate, days: u64) -> NaiveDate {
    day.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Parses `--since`: either `<N>d` (N days before yesterday) or an ISO date.
pub fn parse_since(value: &str, today: NaiveDate) -> Result<NaiveDate, DownloadError> {
    let trimmed = value.trim();
    if let Some(days) = trimmed.strip_suffix(['d', 'D']) {
        let days = days
            .trim()
            .parse::<u64>()
            .map_err(|err| DownloadError::InvalidDate {
                value: value.to_string(),
                reason: err.to_string(),
            })?;
        return Ok(days_before(yesterday(today), days));
    }
    parse_date(trimmed)
}

/// Parses an ISO date, truncating a full timestamp to its date.
pub fn parse_date(value: &str) -> Result<NaiveDate, DownloadError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(trimmed).map(|dt| dt.date()))
        .ok_or_else(|| DownloadError::InvalidDate {
            value: value.to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarDownloadRequest {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    /// Mark the current day partial instead of planning.
    pub today: bool,
    pub images: bool,
    pub dry_run: bool,
    /// Overrides the reference clock's current date.
    pub current_date: Option<NaiveDate>,
}

impl HarDownloadRequest {
    pub fn range(since: NaiveDate, until: NaiveDate) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
            images: true,
            ..Self::default()
        }
    }

    fn reference_date(&self) -> NaiveDate {
        self.current_date.unwrap_or_else(reference_today)
    }

    /// Resolves the open ends of the requested range against `today`.
    pub fn resolve_range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), DownloadError> {
        let (since, until) = match (self.since, self.until) {
            (Some(since), Some(until)) => (since, until),
            (Some(since), None) => (since, yesterday(today)),
            (None, Some(until)) => (days_before(until, DEFAULT_LOOKBACK_DAYS), until),
            (None, None) => {
                let until = yesterday(today);
                (days_before(until, DEFAULT_LOOKBACK_DAYS), until)
            }
        };

        if since > until {
            return Err(DownloadError::InvertedRange { since, until });
        }
        Ok((since, until))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadPlan {
    pub listing_windows: Vec<DateWindow>,
    pub image_batches: ImageBatches,
}

impl DownloadPlan {
    pub fn batch_count(&self) -> usize {
        self.image_batches
            .values()
            .flat_map(|zips| zips.values())
            .map(Vec::len)
            .sum()
    }

    pub fn summary(&self, dry_run: bool) -> PlanSummary {
        PlanSummary {
            dry_run,
            listing_windows: self
                .listing_windows
                .iter()
                .map(|(start, end)| (start.to_string(), end.to_string()))
                .collect(),
            image_batches: self
                .image_batches
                .iter()
                .map(|(day, zips)| (day.to_string(), zips.clone()))
                .collect(),
        }
    }
}

/// Serialized form of a plan, suitable for dry-run inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub dry_run: bool,
    pub listing_windows: Vec<(String, String)>,
    pub image_batches: BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// The day was flagged partial and nothing was planned.
    MarkedToday {
        day: NaiveDate,
        dry_run: bool,
        message: String,
    },
    DryRun(PlanSummary),
    /// A plan exists but no fetch collaborator is wired in yet.
    NotYetExecutable(PlanSummary),
}

impl DownloadOutcome {
    pub fn plan_summary(&self) -> Option<&PlanSummary> {
        match self {
            Self::MarkedToday { .. } => None,
            Self::DryRun(summary) | Self::NotYetExecutable(summary) => Some(summary),
        }
    }
}

pub struct HarDownloader<U> {
    config: HarDownloadConfig,
    detector: GapDetector,
    status_updater: Arc<U>,
    dry_run: bool,
}

impl<U> HarDownloader<U>
where
    U: StatusUpdater + 'static,
{
    pub fn new(
        config: HarDownloadConfig,
        detector: GapDetector,
        status_updater: Arc<U>,
        dry_run: bool,
    ) -> Self {
        Self {
            config,
            detector,
            status_updater,
            dry_run,
        }
    }

    pub fn config(&self) -> &HarDownloadConfig {
        &self.config
    }

    /// Reads the exports and builds a plan for the resolved range.
    pub fn plan(&self, request: &HarDownloadRequest) -> Result<DownloadPlan, DownloadError> {
        let (since, until) = request.resolve_range(request.reference_date())?;
        let snapshot = self.detector.snapshot()?;
        let plan = self.plan_from_snapshot(&snapshot, since, until, request.images);

        info!(
            %since,
            %until,
            windows = plan.listing_windows.len(),
            image_batches = plan.batch_count(),
            "download plan computed"
        );
        Ok(plan)
    }

    pub fn plan_from_snapshot(
        &self,
        snapshot: &SourceSnapshot,
        since: NaiveDate,
        until: NaiveDate,
        images_requested: bool,
    ) -> DownloadPlan {
        // Window sizing follows raw volume, not completeness. Only days that
        // hold rows are counted; the partitioner treats the rest as 0.
        let day_counts: BTreeMap<NaiveDate, usize> = if since <= until {
            snapshot
                .listings
                .range(since..=until)
                .map(|(day, rows)| (*day, rows.len()))
                .collect()
        } else {
            BTreeMap::new()
        };
        let listing_windows = partition_date_range(
            since,
            until,
            &day_counts,
            self.config.limits.max_listings_per_run,
        );

        let image_batches = if images_requested && self.config.images_enabled {
            let gaps = missing_by_zip(snapshot, since, until, &self.config.zip_filters);
            plan_image_batches(&gaps, self.config.limits.max_images_listings_batch)
        } else {
            ImageBatches::new()
        };

        DownloadPlan {
            listing_windows,
            image_batches,
        }
    }

    pub fn execute(&self, request: &HarDownloadRequest) -> Result<DownloadOutcome, DownloadError> {
        if request.today {
            let day = request.reference_date();
            self.status_updater
                .mark_day(day, DayStatus::Partial, None, Some(TODAY_PARTIAL_NOTE))?;
            info!(%day, "marked today as partial");
            return Ok(DownloadOutcome::MarkedToday {
                day,
                dry_run: true,
                message: "Marked today as partial".to_string(),
            });
        }

        let plan = self.plan(request)?;
        let dry_run = self.dry_run || request.dry_run;
        let summary = plan.summary(dry_run);

        if dry_run {
            match serde_json::to_string(&summary) {
                Ok(rendered) => info!(plan = %rendered, "dry-run download plan"),
                Err(err) => warn!(error = %err, "could not render dry-run plan"),
            }
            return Ok(DownloadOutcome::DryRun(summary));
        }

        warn!(
            windows = summary.listing_windows.len(),
            "download execution not yet implemented"
        );
        Ok(DownloadOutcome::NotYetExecutable(summary))
    }
}

/// Day-by-day completeness for `[start, end]`.
pub fn gap_report(
    detector: &GapDetector,
    thresholds: Option<&Thresholds>,
    start: NaiveDate,
    end: NaiveDate,
    images_required: bool,
) -> Result<Vec<DailyGapStatus>, DownloadError> {
    let snapshot = detector.snapshot()?;
    Ok(GapClassifier::new(&snapshot, thresholds, images_required).detect_gaps(start, end))
}

/// Missing-image listings per zip for `[start, end]`.
pub fn missing_images_report(
    detector: &GapDetector,
    start: NaiveDate,
    end: NaiveDate,
    filter: &ZipFilter,
) -> Result<BTreeMap<String, ZipGapView>, DownloadError> {
    let snapshot = detector.snapshot()?;
    let gaps = missing_by_zip(&snapshot, start, end, filter);
    Ok(missing_by_zip_view(&gaps))
}
