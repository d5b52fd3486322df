use std::process::ExitCode;

use apicheck::cli::{self, CliArgs, EXIT_ERROR};
use apicheck::{Config, HarnessError};
use clap::Parser;
use tracing::error;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", HarnessError::from(err));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .init();

    let report = match cli::execute(&args, &config) {
        Ok(report) => report,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match cli::render(&report, args.format) {
        Ok(summary) => println!("{summary}"),
        Err(err) => {
            error!("{err}");
            return ExitCode::from(EXIT_ERROR);
        }
    }

    ExitCode::from(cli::exit_code(&report))
}
