//! Command line definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// TripScout - conversational accommodation search
#[derive(Parser)]
#[command(
    name = "tripscout",
    about = "Find accommodation from a plain-language request and explore the area around it",
    version,
    after_help = "Logs are written to: ~/.local/share/tripscout/logs/tripscout.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive session (default)
    Chat {
        /// First request, handled before the prompt appears
        request: Option<String>,
    },

    /// Run one search and print the listings
    Search {
        /// Trip description, e.g. "Lviv next weekend for two"
        request: String,
    },

    /// Start a worker and list the tools it advertises
    Tools {
        #[arg(value_enum)]
        worker: WorkerKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WorkerKind {
    Accommodation,
    Poi,
}

/// Where `main` writes the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tripscout")
        .join("logs")
        .join("tripscout.log")
}
