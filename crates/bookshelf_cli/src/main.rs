//! Bookshelf interactive CLI.
//!
//! # Responsibility
//! - Resolve configuration, start logging, and run one inventory session.
//! - Map failures to exit codes.

mod app;
mod cli;
mod view;

use bookshelf_core::init_logging;
use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    let config = match cli::config_from_cli(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: invalid configuration: {error}");
            std::process::exit(2);
        }
    };

    // The inventory stays usable without a log file.
    if let Err(error) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: logging disabled: {error}");
    }

    let exit_code = match app::run(&config) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error}");
            1
        }
    };
    std::process::exit(exit_code);
}
