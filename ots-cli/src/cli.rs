use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `OpenTimestamps` command-line interface
#[derive(Parser)]
#[command(name = "ots")]
#[command(about = "OpenTimestamps client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML config file (defaults to `$OTS_CONFIG`, if set)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Create timestamp for file(s)
    Stamp {
        /// Files to timestamp
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Calendar server URLs (can specify multiple)
        #[arg(short, long)]
        calendar: Option<Vec<String>>,

        /// Timeout in seconds
        #[arg(short, long, default_value = "30")]
        timeout: u64,

        /// Calendar submission strategy: all, quorum, or first_success
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Verify a timestamp
    Verify {
        /// OTS file to verify (detached `.ots` or an attached file)
        file: PathBuf,

        /// Original file (optional, derived from .ots filename if not provided)
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Upgrade pending timestamp to a concrete attestation
    Upgrade {
        /// OTS file to upgrade
        file: PathBuf,

        /// Dry run, don't modify file
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Show timestamp information
    Info {
        /// OTS file to inspect
        file: PathBuf,

        /// Show detailed output
        #[arg(short, long)]
        detailed: bool,
    },

    /// Report a timestamp's verification status without printing full detail
    Status {
        /// OTS file to inspect
        file: PathBuf,

        /// Original file (optional, derived from .ots filename if not provided)
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Run a calendar server (not implemented in this build; a calendar
    /// server is explicitly out of scope for a client repository)
    Server {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
}
