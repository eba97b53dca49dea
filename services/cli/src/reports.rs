use crate::infra::{print_json, RunContext};
use chrono::NaiveDate;
use clap::Args;
use har_acquisition::acquisition::downloader::reference_today;
use har_acquisition::acquisition::{
    gap_report, missing_images_report, parse_since, DownloadError, HarDownloadRequest,
    HarDownloader, ZipFilter,
};
use har_acquisition::error::AppError;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct PlanArgs {
    /// Range start: YYYY-MM-DD or `<N>d` for N days before yesterday
    #[arg(long)]
    pub(crate) since: Option<String>,
    /// Range end (YYYY-MM-DD). Defaults to yesterday.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) until: Option<NaiveDate>,
    /// Mark the current day partial instead of planning
    #[arg(long)]
    pub(crate) today: bool,
    /// Skip image batch planning
    #[arg(long)]
    pub(crate) no_images: bool,
    /// Print the plan without executing it
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Override the reference clock's current date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) current_date: Option<NaiveDate>,
}

impl PlanArgs {
    fn into_request(self) -> Result<HarDownloadRequest, DownloadError> {
        let today = self.current_date.unwrap_or_else(reference_today);
        let since = self
            .since
            .as_deref()
            .map(|raw| parse_since(raw, today))
            .transpose()?;

        Ok(HarDownloadRequest {
            since,
            until: self.until,
            today: self.today,
            images: !self.no_images,
            dry_run: self.dry_run,
            current_date: self.current_date,
        })
    }
}

#[derive(Args, Debug)]
pub(crate) struct GapsArgs {
    /// First day of the report (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: NaiveDate,
    /// Last day of the report (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) end: NaiveDate,
    /// Require image coverage for a day to count as complete
    #[arg(long)]
    pub(crate) images: bool,
}

#[derive(Args, Debug)]
pub(crate) struct MissingImagesArgs {
    /// First day to scan (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: NaiveDate,
    /// Last day to scan (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) end: NaiveDate,
    /// Restrict to these zip codes; repeatable. Defaults to the config's filter.
    #[arg(long = "zip")]
    pub(crate) zips: Vec<String>,
}

fn ordered(start: NaiveDate, end: NaiveDate) -> Result<(), DownloadError> {
    if start > end {
        return Err(DownloadError::InvertedRange {
            since: start,
            until: end,
        });
    }
    Ok(())
}

pub(crate) fn run_plan(context: &RunContext, args: PlanArgs) -> Result<(), AppError> {
    let request = args.into_request()?;
    let downloader = HarDownloader::new(
        context.download.clone(),
        context.detector(),
        Arc::new(context.ledger()),
        false,
    );

    let outcome = downloader.execute(&request)?;
    print_json(&outcome)
}

pub(crate) fn run_gaps(context: &RunContext, args: GapsArgs) -> Result<(), AppError> {
    ordered(args.start, args.end)?;
    let rows = gap_report(
        &context.detector(),
        context.download.expected_min.as_ref(),
        args.start,
        args.end,
        args.images,
    )?;

    info!(
        start = %args.start,
        end = %args.end,
        days = rows.len(),
        "gap report computed"
    );
    print_json(&rows)
}

pub(crate) fn run_missing_images(
    context: &RunContext,
    args: MissingImagesArgs,
) -> Result<(), AppError> {
    ordered(args.start, args.end)?;
    let filter = if args.zips.is_empty() {
        context.download.zip_filters.clone()
    } else {
        ZipFilter::from_codes(&args.zips)
    };

    let report = missing_images_report(&context.detector(), args.start, args.end, &filter)?;
    info!(zips = report.len(), "missing-image report computed");
    print_json(&report)
}
