// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;

use social_distance::cli::analyze::run_analyze;
use social_distance::cli::args::{Cli, Commands};
use social_distance::cli::monitor::run_monitor;
use social_distance::error;

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Monitor(args) => run_monitor(args),
        Commands::Analyze(args) => run_analyze(args),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
