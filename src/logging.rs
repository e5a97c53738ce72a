//! Diagnostic logging.
//!
//! The chat UI owns the terminal, so diagnostics only ever go to a file. When
//! no file is requested no subscriber is installed and `tracing` macros are
//! no-ops.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive (e.g. `jerseychat=debug`).
pub const LOG_FILTER_ENV: &str = "JERSEYCHAT_LOG";

const DEFAULT_FILTER: &str = "warn";

pub fn init_file_logging(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Test if we can create/write to the file before installing anything
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;
    Ok(())
}
