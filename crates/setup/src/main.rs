//! `hailo-setup`: configuration, environment and resource setup for Hailo
//! applications.
//!
//! Every subcommand first resolves the configuration (defaults, config file,
//! command-line overrides, then detection for anything left at `auto`). If
//! resolution fails, every problem is printed and the process exits with
//! status 1 before anything is written or downloaded.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;

fn main() -> ExitCode {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	match commands::run(cli) {
		Ok(()) => ExitCode::SUCCESS,
		Err(error) => {
			eprintln!("error: {error}");
			ExitCode::FAILURE
		}
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("debug")
		} else {
			EnvFilter::new("info")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(verbose)
		.init();
}
