mod args;
mod logging;

use anyhow::Result;
use clap::Parser;
use std::process;

/// Main entry point of the application
/// Handles argument parsing and executes the program with error handling
fn main() -> Result<()> {
    // Parse command line arguments
    let args = args::Args::parse();
    let subscriber = logging::subscriber(args.level());

    // Execute the program with logging scoped to this run
    if let Err(e) = tracing::subscriber::with_default(subscriber, || run(args)) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    Ok(())
}

/// Runs the rename based on the provided arguments
///
/// # Arguments
/// * `args` - Parsed command line arguments
fn run(args: args::Args) -> Result<()> {
    let options = args.to_options()?;
    args.log_options(&options);

    match rxrename::run(&options)? {
        rxrename::Outcome::DryRun { planned } => {
            tracing::debug!(planned, "dry run finished");
        }
        rxrename::Outcome::Renamed { count } => {
            tracing::info!("renamed {} paths", count);
        }
    }

    Ok(())
}
