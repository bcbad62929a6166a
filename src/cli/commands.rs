//! CLI command implementations
//!
//! Startup sequence for `run`:
//! 1. Configuration load
//! 2. Schema load (when `schema_dir` is set)
//! 3. API activation
//! 4. Serving loop over JSON-line requests
//! 5. Shutdown with a metrics summary

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use crate::api::ApiHandler;
use crate::auth::ScopeAuthorizer;
use crate::config::StoreConfig;
use crate::observability::{Event, Logger};
use crate::schema::SchemaLoader;
use crate::store::Store;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{open_requests, read_requests, write_error, write_json};

/// Main CLI entry point
///
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Run { config, requests } => start(&config, requests.as_deref()),
        Command::Check { config } => check(&config),
    }
}

/// Load and validate the configuration, logging the outcome
fn load_config(config_path: &Path) -> CliResult<StoreConfig> {
    let config = StoreConfig::load(config_path)?;
    let path = config_path.display().to_string();
    Logger::with_quiet(config.quiet).event(Event::ConfigLoaded, &[("path", path.as_str())]);
    Ok(config)
}

/// Build the store and its client registry, registering schema files.
pub fn boot(config: StoreConfig) -> CliResult<ApiHandler> {
    let clients = Arc::new(ScopeAuthorizer::new());
    let schema_dir = config.schema_dir.clone();
    let store = Arc::new(Store::new(config, clients.clone()));
    if let Some(dir) = schema_dir {
        store.load_schemas(&SchemaLoader::new(dir))?;
    }
    Ok(ApiHandler::new(store, clients))
}

/// Answer every request line with one response line.
///
/// Returns the number of requests handled. A read failure ends the loop.
pub fn serve<R: BufRead, W: Write>(handler: &ApiHandler, reader: R, out: &mut W) -> CliResult<usize> {
    let mut handled = 0;
    for line in read_requests(reader) {
        let line = line?;
        let response = handler.handle(&line);
        write_json(out, &response.to_json())?;
        handled += 1;
    }
    Ok(handled)
}

/// Boot and serve until the request stream ends
pub fn start(config_path: &Path, requests: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let logger = Logger::with_quiet(config.quiet);
    logger.event(Event::Startup, &[]);

    let handler = boot(config)?;
    let reader = open_requests(requests)?;
    logger.event(Event::Serving, &[]);

    let mut stdout = io::stdout();
    let result = serve(&handler, reader, &mut stdout);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }

    let handled = result.as_ref().map(|n| n.to_string()).unwrap_or_else(|_| "-".to_string());
    let metrics = serde_json::to_string(&handler.store().metrics())
        .map_err(|e| CliError::io_error(format!("JSON error: {}", e)))?;
    logger.event(
        Event::Shutdown,
        &[("metrics", metrics.as_str()), ("requests", handled.as_str())],
    );
    result.map(|_| ())
}

/// Validate configuration and schema files without serving
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let handler = boot(config)?;
    let collections = handler.store().collection_count()?;
    let report = serde_json::json!({
        "status": "ok",
        "data": {"collections": collections}
    });
    write_json(&mut io::stdout(), &report.to_string())
}
