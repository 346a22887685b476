use std::sync::Arc;

use frontdesk_core::domain::result::Result as CoreResult;
use frontdesk_core::services::{ImportRequest, ImportResult, LogEvent, LoggingService};
use frontdesk_core::FrontdeskContext;

use crate::error::{AppError, AppResult};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<FrontdeskContext>,
    /// Event log; `None` when logs.duckdb couldn't be opened
    pub logger: Option<Arc<LoggingService>>,
}

impl AppState {
    pub fn new(ctx: FrontdeskContext, logger: Option<LoggingService>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            logger: logger.map(Arc::new),
        }
    }

    /// Record an event on the blocking pool; failures to log never fail
    /// the request
    pub async fn log(&self, event: LogEvent) {
        let Some(logger) = self.logger.clone() else {
            return;
        };
        match tokio::task::spawn_blocking(move || logger.log(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "event log write failed"),
            Err(e) => tracing::debug!(error = %e, "event log task failed"),
        }
    }

    /// Run an import on the blocking pool.
    ///
    /// The store behind the import service does synchronous DuckDB work
    /// between its await points, so the whole pipeline is driven on a
    /// blocking thread instead of a runtime worker.
    pub async fn import(&self, request: ImportRequest) -> AppResult<ImportResult> {
        let ctx = Arc::clone(&self.ctx);
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || handle.block_on(ctx.import_service.import(request)))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(AppError::from)
    }

    /// Run synchronous store work off the async runtime
    pub async fn blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&FrontdeskContext) -> CoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = Arc::clone(&self.ctx);
        tokio::task::spawn_blocking(move || f(&ctx))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(AppError::from)
    }
}
