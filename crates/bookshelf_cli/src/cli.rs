//! Command-line flags.

use bookshelf_core::{AppConfig, ConfigError};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bookshelf",
    version,
    about = "Interactive book inventory manager",
    long_about = "List, search, add, edit and delete book records.\n\n\
                  Records persist to a local SQLite file unless --in-memory is given.\n\
                  Defaults can also be set with BOOKSHELF_DATA_DIR, BOOKSHELF_LOG_DIR\n\
                  and BOOKSHELF_LOG_LEVEL."
)]
pub struct Cli {
    /// Directory holding the durable book records.
    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for rolling log files (default: <DATA_DIR>/logs).
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log level written to the log file.
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Keep records in memory only; nothing is written to disk.
    #[arg(long = "in-memory")]
    pub in_memory: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Resolves configuration: environment defaults, then flag overrides.
pub fn config_from_cli(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::from_env()?;

    if let Some(data_dir) = &cli.data_dir {
        // Logs follow an overridden data dir unless placed explicitly.
        if config.log_dir == config.data_dir.join("logs") {
            config.log_dir = data_dir.join("logs");
        }
        config.data_dir = data_dir.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = log_dir.clone();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.as_str().to_string();
    }
    config.in_memory = cli.in_memory;

    config.validate()?;
    Ok(config)
}
