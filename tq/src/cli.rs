//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::Priority;

/// TaskQueue - bounded-concurrency task runner
#[derive(Parser)]
#[command(
    name = "tq",
    about = "Run work lists through a priority scheduler with bounded concurrency and retries",
    version,
    after_help = "Logs are written to: ~/.local/share/taskqueue/logs/taskqueue.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run every item of a work list as a shell command
    Run {
        /// Work list file, one command per line
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Maximum concurrent commands
        #[arg(short, long)]
        limit: Option<usize>,

        /// Scheduler retries per item after its first failure
        #[arg(short, long)]
        retries: Option<u32>,

        /// Priority for items without an @priority prefix
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Attempts per scheduled run (bounded retry inside the task)
        #[arg(long)]
        attempts: Option<u32>,

        /// Delay between bounded-retry attempts in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Output format for the summary
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,

    /// Show logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short, long, default_value = "50")]
        lines: usize,
    },
}

/// Output format for the run summary
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Path of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskqueue")
        .join("logs")
        .join("taskqueue.log")
}
