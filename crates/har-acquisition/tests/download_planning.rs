use chrono::NaiveDate;
use har_acquisition::acquisition::{
    gap_report, missing_images_report, DayStatus, DownloadOutcome, GapDetector,
    HarDownloadConfig, HarDownloadRequest, HarDownloader, InMemoryStatusLedger, JsonFileLedger,
    Thresholds, ZipFilter,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, d).expect("valid date")
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn sample_detector() -> GapDetector {
    GapDetector::new(
        fixture("har_listings_sample.csv"),
        Some(fixture("listings_images_sample.csv")),
    )
}

fn make_config(limits: serde_json::Value) -> HarDownloadConfig {
    HarDownloadConfig::from_value(&json!({ "limits": limits })).expect("valid config")
}

fn downloader(config: HarDownloadConfig) -> HarDownloader<InMemoryStatusLedger> {
    HarDownloader::new(
        config,
        sample_detector(),
        Arc::new(InMemoryStatusLedger::new()),
        true,
    )
}

fn keys(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn presence_only_gap_report_counts_rows_per_day() {
    let rows = gap_report(&sample_detector(), None, day(5), day(9), false).expect("report");
    let counts: Vec<_> = rows
        .iter()
        .map(|row| (row.status, row.listings_count, row.images_count))
        .collect();

    assert_eq!(
        counts,
        vec![
            (DayStatus::Complete, 2, None),
            (DayStatus::Complete, 3, None),
            (DayStatus::Complete, 4, None),
            (DayStatus::Complete, 1, None),
            (DayStatus::Missing, 0, None),
        ]
    );
}

#[test]
fn thresholds_and_image_coverage_mark_partial_days() {
    let thresholds = Thresholds::from_value(&json!({
        "listings_per_day": 3,
        "images_ratio": 0.5
    }))
    .expect("valid thresholds");

    let rows =
        gap_report(&sample_detector(), Some(&thresholds), day(5), day(7), true).expect("report");

    assert_eq!(rows[0].status, DayStatus::Partial, "2 listings below minimum of 3");
    assert_eq!(rows[1].status, DayStatus::Partial, "1 of 3 listings has images");
    assert_eq!(rows[1].images_count, Some(1));
    assert_eq!(rows[2].status, DayStatus::Complete, "ratio exactly 0.5 passes");
    assert_eq!(rows[2].images_count, Some(2));
}

#[test]
fn missing_images_are_grouped_by_zip() {
    let filter = ZipFilter::from_codes(["77002", "73301"]);
    let missing =
        missing_images_report(&sample_detector(), day(5), day(7), &filter).expect("report");

    assert_eq!(missing.len(), 2);
    assert_eq!(missing["77002"].dates["2025-10-05"], keys(&["HAR101"]));
    assert_eq!(missing["77002"].dates["2025-10-06"], keys(&["HAR200"]));
    assert_eq!(missing["73301"].dates["2025-10-07"], keys(&["HAR104", "HAR202"]));
    assert_eq!(missing["73301"].listings, keys(&["HAR104", "HAR202"]));
}

#[test]
fn planner_computes_windows_under_listing_limit() {
    let planner = downloader(make_config(json!({
        "max_listings_per_run": 3,
        "max_images_listings_batch": 100
    })));
    let plan = planner
        .plan(&HarDownloadRequest::range(day(5), day(8)))
        .expect("plan builds");

    assert_eq!(
        plan.listing_windows,
        vec![
            (day(5), day(5)),
            (day(6), day(6)),
            (day(7), day(7)),
            (day(8), day(8)),
        ]
    );

    assert_eq!(plan.image_batches[&day(5)]["77002"], vec![keys(&["HAR101"])]);
    assert_eq!(plan.image_batches[&day(6)]["77002"], vec![keys(&["HAR200"])]);
    assert_eq!(plan.image_batches[&day(6)]["77479"], vec![keys(&["HAR102"])]);
    assert_eq!(
        plan.image_batches[&day(7)]["73301"],
        vec![keys(&["HAR104", "HAR202"])]
    );
    assert_eq!(plan.image_batches[&day(8)]["73301"], vec![keys(&["HAR204"])]);
}

#[test]
fn dry_run_summary_lists_windows_and_batches() {
    let planner = downloader(make_config(json!({
        "max_listings_per_run": 5000,
        "max_images_listings_batch": 1
    })));
    let outcome = planner
        .execute(&HarDownloadRequest::range(day(5), day(7)))
        .expect("plan builds");

    let DownloadOutcome::DryRun(summary) = outcome else {
        panic!("expected a dry-run outcome");
    };
    assert!(summary.dry_run);
    assert_eq!(
        summary.listing_windows,
        vec![("2025-10-05".to_string(), "2025-10-07".to_string())]
    );
    assert_eq!(
        summary.image_batches["2025-10-07"]["73301"],
        vec![keys(&["HAR104"]), keys(&["HAR202"])]
    );
}

#[test]
fn images_can_be_disabled_by_request_or_config() {
    let planner = downloader(HarDownloadConfig::default());
    let request = HarDownloadRequest {
        images: false,
        ..HarDownloadRequest::range(day(5), day(8))
    };
    assert!(planner.plan(&request).expect("plan").image_batches.is_empty());

    let config = HarDownloadConfig::from_value(&json!({ "images": { "enabled": false } }))
        .expect("valid config");
    let plan = downloader(config)
        .plan(&HarDownloadRequest::range(day(5), day(8)))
        .expect("plan");
    assert!(plan.image_batches.is_empty());
    assert_eq!(plan.listing_windows, vec![(day(5), day(8))]);
}

#[test]
fn zip_filters_from_config_restrict_batches() {
    let config = HarDownloadConfig::from_value(&json!({
        "images": { "zip_filters": ["77479"] }
    }))
    .expect("valid config");
    let plan = downloader(config)
        .plan(&HarDownloadRequest::range(day(5), day(8)))
        .expect("plan");

    assert_eq!(plan.image_batches.len(), 1);
    assert_eq!(plan.image_batches[&day(6)]["77479"], vec![keys(&["HAR102"])]);
}

#[test]
fn planning_is_idempotent_for_unchanged_inputs() {
    let planner = downloader(make_config(json!({
        "max_listings_per_run": 3,
        "max_images_listings_batch": 1
    })));
    let request = HarDownloadRequest::range(day(1), day(10));

    let first = serde_json::to_string(&planner.execute(&request).expect("first run"))
        .expect("serializes");
    let second = serde_json::to_string(&planner.execute(&request).expect("second run"))
        .expect("serializes");
    assert_eq!(first, second);
}

#[test]
fn empty_environment_plans_without_failing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let detector = GapDetector::new(
        dir.path().join("listings.csv"),
        Some(dir.path().join("images.csv")),
    );

    let rows = gap_report(&detector, None, day(1), day(3), true).expect("report");
    assert!(rows.iter().all(|row| row.status == DayStatus::Missing));

    let planner = HarDownloader::new(
        HarDownloadConfig::default(),
        detector,
        Arc::new(InMemoryStatusLedger::new()),
        true,
    );
    let outcome = planner
        .execute(&HarDownloadRequest::range(day(1), day(3)))
        .expect("plan builds");
    let summary = outcome.plan_summary().expect("plan summary present");
    assert_eq!(summary.listing_windows.len(), 1);
    assert!(summary.image_batches.is_empty());

    let rendered = serde_json::to_value(summary).expect("serializes");
    assert_eq!(rendered["image_batches"], json!({}));
}

#[test]
fn today_flag_overrides_fully_covered_day() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ledger = Arc::new(JsonFileLedger::new(dir.path().join("ledger.json")));
    let planner = HarDownloader::new(
        HarDownloadConfig::default(),
        sample_detector(),
        ledger.clone(),
        false,
    );

    let request = HarDownloadRequest {
        today: true,
        current_date: Some(day(5)),
        ..HarDownloadRequest::default()
    };
    let outcome = planner.execute(&request).expect("today marked");
    assert_eq!(
        serde_json::to_value(&outcome).expect("serializes")["message"],
        json!("Marked today as partial")
    );

    let state = ledger.load().expect("ledger readable");
    let row = state.day(day(5)).expect("day recorded");
    assert_eq!(row.status, DayStatus::Partial);
    assert_eq!(row.notes.as_deref(), Some("Marked partial via --today"));
}
