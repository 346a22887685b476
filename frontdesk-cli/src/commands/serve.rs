//! Serve command - run the HTTP import endpoint

use anyhow::Result;

use super::{get_context, get_data_dir};
use frontdesk_api::AppState;
use frontdesk_core::services::{EntryPoint, LogEvent, LoggingService};

pub fn run(host: Option<String>, port: Option<u16>) -> Result<()> {
    frontdesk_api::init_tracing();

    let mut ctx = get_context()?;
    if let Some(host) = host {
        ctx.config.host = host;
    }
    if let Some(port) = port {
        ctx.config.port = port;
    }

    let logger =
        match LoggingService::new(&get_data_dir(), EntryPoint::Server, env!("CARGO_PKG_VERSION")) {
            Ok(logger) => Some(logger),
            Err(e) => {
                tracing::warn!(error = %e, "event log unavailable");
                None
            }
        };

    let addr = ctx.config.bind_address();
    let state = AppState::new(ctx, logger);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        state
            .log(LogEvent::new("server_started").with_detail(addr.clone()))
            .await;
        frontdesk_api::serve(state, &addr).await
    })
}
