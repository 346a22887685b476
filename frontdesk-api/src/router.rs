use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handlers::{gestioni, health, import};
use crate::state::AppState;

/// Upper bound for an import request body (CSV text travels inline)
pub const MAX_IMPORT_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Routes under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/gestione/import",
            post(import::import_csv).layer(DefaultBodyLimit::max(MAX_IMPORT_BODY_BYTES)),
        )
        .route(
            "/gestioni",
            get(gestioni::list_gestioni).post(gestioni::create_gestione),
        )
        .route(
            "/gestioni/{id}",
            get(gestioni::get_gestione).delete(gestioni::delete_gestione),
        )
        .route("/gestioni/{id}/items", get(gestioni::list_items))
        .route("/gestioni/{id}/export", get(gestioni::export_items))
        .route(
            "/gestioni/{id}/mapping/suggest",
            post(gestioni::suggest_mapping),
        )
}

/// Build the full application router with the tracing layer and state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
