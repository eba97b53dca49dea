use crate::infra::SourceArgs;
use crate::ledger::{run_ledger, LedgerCommand};
use crate::reports::{run_gaps, run_missing_images, run_plan, GapsArgs, MissingImagesArgs, PlanArgs};
use clap::{Parser, Subcommand};
use har_acquisition::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "har-acq",
    about = "Detect acquisition gaps in listing exports and plan bounded download runs",
    version
)]
struct Cli {
    #[command(flatten)]
    sources: SourceArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a listing/image download plan for a date range
    Plan(PlanArgs),
    /// Report per-day completeness for a date range
    Gaps(GapsArgs),
    /// List listings still missing images, grouped by zip code
    MissingImages(MissingImagesArgs),
    /// Inspect or update the acquisition ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let context = cli.sources.load()?;

    match cli.command {
        Command::Plan(args) => run_plan(&context, args),
        Command::Gaps(args) => run_gaps(&context, args),
        Command::MissingImages(args) => run_missing_images(&context, args),
        Command::Ledger { command } => run_ledger(&context, command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plan_flags_parse() {
        let cli = Cli::try_parse_from([
            "har-acq",
            "--listings-csv",
            "listings.csv",
            "plan",
            "--since",
            "7d",
            "--no-images",
            "--dry-run",
        ])
        .expect("arguments parse");

        let Command::Plan(args) = cli.command else {
            panic!("expected plan command");
        };
        assert_eq!(args.since.as_deref(), Some("7d"));
        assert!(args.no_images);
        assert!(args.dry_run);
        assert!(!args.today);
    }
}
