//! Handlers for gestione management, item listing, export and mapping suggestions.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use frontdesk_core::services::{GestioneSummary, LogEvent};
use frontdesk_core::{ColumnMapping, Gestione, GestioneItem};

use crate::error::AppResult;
use crate::state::AppState;

/// Request body for creating a gestione
#[derive(Debug, Deserialize)]
pub struct CreateGestione {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for a mapping suggestion
#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub csv_text: String,
}

/// GET /api/gestioni
pub async fn list_gestioni(State(state): State<AppState>) -> AppResult<Json<Vec<GestioneSummary>>> {
    let list = state.blocking(|ctx| ctx.gestione_service.list()).await?;
    Ok(Json(list))
}

/// POST /api/gestioni
pub async fn create_gestione(
    State(state): State<AppState>,
    Json(input): Json<CreateGestione>,
) -> AppResult<(StatusCode, Json<Gestione>)> {
    let gestione = state
        .blocking(move |ctx| {
            ctx.gestione_service
                .create(&input.name, input.description.as_deref())
        })
        .await?;
    state
        .log(
            LogEvent::new("gestione_created")
                .with_command("POST /api/gestioni")
                .with_gestione(&gestione.id),
        )
        .await;
    Ok((StatusCode::CREATED, Json(gestione)))
}

/// GET /api/gestioni/{id}
pub async fn get_gestione(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Gestione>> {
    let gestione = state.blocking(move |ctx| ctx.gestione_service.get(&id)).await?;
    Ok(Json(gestione))
}

/// DELETE /api/gestioni/{id}
///
/// Removes the gestione and every item imported into it.
pub async fn delete_gestione(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let deleted_id = id.clone();
    state
        .blocking(move |ctx| ctx.gestione_service.delete(&deleted_id))
        .await?;
    state
        .log(
            LogEvent::new("gestione_deleted")
                .with_command("DELETE /api/gestioni/{id}")
                .with_gestione(id),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/gestioni/{id}/items
pub async fn list_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<GestioneItem>>> {
    let items = state
        .blocking(move |ctx| ctx.gestione_service.items(&id))
        .await?;
    Ok(Json(items))
}

/// GET /api/gestioni/{id}/export
pub async fn export_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let disposition = format!("attachment; filename=\"gestione-{}.csv\"", id);
    let csv = state
        .blocking(move |ctx| ctx.gestione_service.export_csv(&id))
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// POST /api/gestioni/{id}/mapping/suggest
pub async fn suggest_mapping(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<SuggestRequest>,
) -> AppResult<Json<ColumnMapping>> {
    let mapping = state
        .blocking(move |ctx| ctx.gestione_service.suggest_mapping_for(&id, &input.csv_text))
        .await?;
    Ok(Json(mapping))
}
