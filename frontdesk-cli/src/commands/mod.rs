//! CLI command implementations

pub mod gestione;
pub mod import;
pub mod items;
pub mod logs;
pub mod serve;

use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, Result};
use frontdesk_core::services::{EntryPoint, LogEvent, LoggingService};
use frontdesk_core::FrontdeskContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from FRONTDESK_DIR or ~/.frontdesk
pub fn get_data_dir() -> PathBuf {
    frontdesk_core::config::data_dir()
}

/// Open the database and services
pub fn get_context() -> Result<FrontdeskContext> {
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    FrontdeskContext::new(&data_dir).context("Failed to initialize frontdesk context")
}

/// Drive an async service call from a synchronous command
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
