//! CLI module - Command-line interface for Sponsor Desk

mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Sponsor Desk - sponsor calendar with email reminders
#[derive(Parser)]
#[command(name = "sponsordesk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server and the reminder scheduler (default)
    #[command(alias = "daemon", alias = "web")]
    Serve,

    /// Run one reminder pass now and exit
    Remind {
        /// Treat this date (YYYY-MM-DD) as today instead of the system date
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// List registered users
    #[command(alias = "ls")]
    Users,
}

pub use commands::*;
