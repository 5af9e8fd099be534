use clap::Parser;
use dl_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible.
    if cli.verbose {
        logging::init_logging_stderr(true);
    } else if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr(false);
        tracing::warn!("log file unavailable, logging to stderr: {:#}", err);
    }

    if let Err(err) = cli.run().await {
        eprintln!("dl error: {:#}", err);
        std::process::exit(1);
    }
}
