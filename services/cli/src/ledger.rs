use crate::infra::{print_json, RunContext};
use chrono::NaiveDate;
use clap::Subcommand;
use har_acquisition::acquisition::{DayStatus, ImageStatus, StatusError, StatusUpdater};
use har_acquisition::error::AppError;
use tracing::info;

#[derive(Subcommand, Debug)]
pub(crate) enum LedgerCommand {
    /// Record a day's acquisition status (COMPLETE, PARTIAL or MISSING)
    MarkDay {
        /// Day to record (YYYY-MM-DD)
        #[arg(long, value_parser = crate::infra::parse_date)]
        date: NaiveDate,
        #[arg(long)]
        status: String,
        /// Number of files fetched for the day
        #[arg(long)]
        files_count: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record a listing's image status
    MarkImages {
        #[arg(long)]
        listing_key: String,
        #[arg(long)]
        domain: String,
        /// complete, partial, failed, no_images or unknown
        #[arg(long)]
        status: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Print the ledger, optionally a single day
    Show {
        #[arg(long, value_parser = crate::infra::parse_date)]
        date: Option<NaiveDate>,
    },
}

pub(crate) fn run_ledger(context: &RunContext, command: LedgerCommand) -> Result<(), AppError> {
    let ledger = context.ledger();

    match command {
        LedgerCommand::MarkDay {
            date,
            status,
            files_count,
            notes,
        } => {
            let status: DayStatus = status.parse().map_err(StatusError::from)?;
            let row = ledger.mark_day(date, status, files_count, notes.as_deref())?;
            info!(%date, status = %row.status, "day status recorded");
            print_json(&row)
        }
        LedgerCommand::MarkImages {
            listing_key,
            domain,
            status,
            notes,
        } => {
            let status: ImageStatus = status.parse().map_err(StatusError::from)?;
            let row = ledger.mark_listing_images(&listing_key, &domain, status, notes.as_deref())?;
            info!(
                listing_key = %row.listing_key,
                domain = %row.domain,
                status = %row.status,
                "image status recorded"
            );
            print_json(&row)
        }
        LedgerCommand::Show { date: Some(date) } => {
            let state = ledger.load()?;
            print_json(&state.day(date))
        }
        LedgerCommand::Show { date: None } => print_json(&ledger.load()?),
    }
}
