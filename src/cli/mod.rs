//! CLI module for PlusDB
//!
//! Provides command-line interface for:
//! - run: Boot the store and serve JSON-line requests
//! - check: Validate configuration and schema files

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{boot, check, run, run_command, serve, start};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{open_requests, read_requests, write_error, write_json};
