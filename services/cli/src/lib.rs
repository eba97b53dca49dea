mod cli;
mod infra;
mod ledger;
mod reports;

use har_acquisition::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
