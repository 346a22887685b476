use std::process::ExitCode;

use frontdesk_api::{init_tracing, serve, AppState};
use frontdesk_core::config::data_dir;
use frontdesk_core::services::{EntryPoint, LogEvent, LoggingService};
use frontdesk_core::FrontdeskContext;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let dir = data_dir();
    let ctx = FrontdeskContext::new(&dir)?;
    tracing::info!(data_dir = %dir.display(), batch_size = ctx.config.batch_size, "Loaded configuration");

    let logger = match LoggingService::new(&dir, EntryPoint::Server, env!("CARGO_PKG_VERSION")) {
        Ok(logger) => Some(logger),
        Err(e) => {
            tracing::warn!(error = %e, "event log unavailable");
            None
        }
    };

    let addr = ctx.config.bind_address();
    let state = AppState::new(ctx, logger);
    state
        .log(LogEvent::new("server_started").with_detail(addr.clone()))
        .await;

    serve(state, &addr).await
}
