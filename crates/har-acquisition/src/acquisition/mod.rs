//! Acquisition gap detection and download planning.
//!
//! Readers turn the listing and image exports into a per-call
//! [`SourceSnapshot`]; the classifier and zip aggregator read that snapshot,
//! and [`HarDownloader`] composes window and batch planning into a
//! [`DownloadPlan`].

pub mod batches;
pub mod classifier;
pub mod downloader;
pub mod ledger;
pub mod records;
pub mod settings;
pub mod thresholds;
pub mod windows;
pub mod zip_gaps;

pub use classifier::{DailyGapStatus, DayStatus, GapClassifier};
pub use downloader::{
    gap_report, missing_images_report, parse_date, parse_since, DownloadError, DownloadOutcome,
    DownloadPlan, HarDownloadRequest, HarDownloader, PlanSummary,
};
pub use ledger::{
    DailyStatusRow, ImageStatusRow, InMemoryStatusLedger, JsonFileLedger, LedgerState,
    StatusError, StatusUpdater,
};
pub use records::{GapDetector, ImageStatus, ListingIdentity, ReaderError, SourceSnapshot};
pub use settings::{HarDownloadConfig, Limits, SettingsError};
pub use thresholds::{ThresholdError, Thresholds};
pub use zip_gaps::{ZipFilter, ZipGap, ZipGapView};
