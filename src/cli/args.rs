//! CLI argument definitions using clap
//!
//! Commands:
//! - aerorepo query --config <path>
//! - aerorepo explain --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aerorepo - query execution over a fixture-seeded document store
#[derive(Parser, Debug)]
#[command(name = "aerorepo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one query request read from stdin
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./aerorepo.json")]
        config: PathBuf,
    },

    /// Show the strategy and effective query for a request, without running it
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./aerorepo.json")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
