//! CLI argument definitions using clap
//!
//! Commands:
//! - plusdb run --config <path> [--requests <file>]
//! - plusdb check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PlusDB - document store with secondary-index queries and live aggregations
#[derive(Parser, Debug)]
#[command(name = "plusdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve JSON-line requests until end of input
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./plusdb.json")]
        config: PathBuf,

        /// Read requests from this file instead of stdin
        #[arg(long)]
        requests: Option<PathBuf>,
    },

    /// Validate the configuration and schema files, then exit
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./plusdb.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
