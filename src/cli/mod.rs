pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mikan-relay")]
#[command(about = "Relay Mikan RSS releases to Alist offline downloads", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/mikan-relay/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the feed and dispatch new releases until stopped
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Run one full cycle and exit
    Check,
    /// List dispatched releases, newest first
    History {
        /// Number of records to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show the config file location and validate it
    Config,
}
