//! Handler for the CSV import endpoint.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use frontdesk_core::services::{ImportRequest, ImportResult, LogEvent};
use frontdesk_core::{ColumnMapping, Error as CoreError, NormalizedItem};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const ROUTE: &str = "POST /api/gestione/import";

/// Response body of a successful import
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub ok: bool,
    pub inserted: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub preview: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<NormalizedItem>,
}

impl From<ImportResult> for ImportResponse {
    fn from(result: ImportResult) -> Self {
        Self {
            ok: true,
            inserted: result.inserted,
            skipped: result.skipped,
            preview: result.preview,
            items: result.items,
        }
    }
}

/// Form fields as received; flags are `"1"` for on
#[derive(Debug, Default)]
struct ImportForm {
    gestione_id: Option<String>,
    csv_text: Option<String>,
    mapping_json: Option<String>,
    save_mapping_default: Option<String>,
    skip_duplicates: Option<String>,
    preview: Option<String>,
}

fn flag(value: &Option<String>) -> Option<bool> {
    value.as_deref().map(|v| v.trim() == "1")
}

impl ImportForm {
    /// Validate the form into a pipeline request.
    /// `skip_duplicates` falls back to `skip_default` when the field is absent.
    fn into_request(self, skip_default: bool) -> Result<ImportRequest, CoreError> {
        let gestione_id = self
            .gestione_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::validation("gestione_id is required"))?;
        let csv_text = self
            .csv_text
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CoreError::validation("csv_text is required"))?;
        let mapping = match self.mapping_json.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => Some(ColumnMapping::from_json(json)?),
            _ => None,
        };

        Ok(ImportRequest {
            gestione_id,
            csv_text,
            mapping,
            save_mapping_default: flag(&self.save_mapping_default).unwrap_or(false),
            skip_duplicates: flag(&self.skip_duplicates).unwrap_or(skip_default),
            preview: flag(&self.preview).unwrap_or(false),
        })
    }
}

/// POST /api/gestione/import
///
/// Multipart form with `gestione_id`, `csv_text` and the optional
/// `mapping_json`, `save_mapping_default`, `skip_duplicates` and `preview`
/// fields.
pub async fn import_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ImportResponse>> {
    let mut form = ImportForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        let slot = match name.as_str() {
            "gestione_id" => &mut form.gestione_id,
            "csv_text" => &mut form.csv_text,
            "mapping_json" => &mut form.mapping_json,
            "save_mapping_default" => &mut form.save_mapping_default,
            "skip_duplicates" => &mut form.skip_duplicates,
            "preview" => &mut form.preview,
            _ => continue, // ignore unknown fields
        };
        let text = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        *slot = Some(text);
    }

    let gestione_id = form.gestione_id.clone().unwrap_or_default();
    let outcome = match form.into_request(state.ctx.config.skip_duplicates_default) {
        Ok(request) => state.import(request).await,
        Err(e) => Err(AppError::from(e)),
    };

    match outcome {
        Ok(result) => {
            state
                .log(
                    LogEvent::new(if result.preview { "import_previewed" } else { "import_completed" })
                        .with_command(ROUTE)
                        .with_gestione(gestione_id.trim())
                        .with_detail(format!(
                            "inserted={} skipped={} duplicates={} empty={}",
                            result.inserted, result.skipped, result.duplicates, result.empty
                        )),
                )
                .await;
            Ok(Json(result.into()))
        }
        Err(e) => {
            state
                .log(
                    LogEvent::new("import_failed")
                        .with_command(ROUTE)
                        .with_gestione(gestione_id.trim())
                        .with_error(e.to_string()),
                )
                .await;
            Err(e)
        }
    }
}
