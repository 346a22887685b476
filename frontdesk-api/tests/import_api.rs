//! Integration tests for POST /api/gestione/import.

mod common;

use axum::http::StatusCode;
use common::{body_json, post_multipart, TestApp};

const CSV: &str = "Nome;Telefono\nMario;333123456\nLuca;\n";
const MAPPING: &str = r#"{"Nome":"nome","Telefono":"telefono"}"#;

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_returns_counts() {
    let app = TestApp::new();
    let id = app.create_gestione("Rinnovi");

    let response = post_multipart(
        app.router(),
        "/api/gestione/import",
        &[
            ("gestione_id", id.as_str()),
            ("csv_text", CSV),
            ("mapping_json", MAPPING),
            ("skip_duplicates", "0"),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!({"ok": true, "inserted": 2, "skipped": 0}));
}

#[tokio::test]
async fn reimport_skips_duplicates_by_default() {
    let app = TestApp::new();
    let id = app.create_gestione("Rinnovi");
    let fields = [("gestione_id", id.as_str()), ("csv_text", CSV), ("mapping_json", MAPPING)];

    post_multipart(app.router(), "/api/gestione/import", &fields).await;
    let response = post_multipart(
        app.router(),
        "/api/gestione/import",
        &[
            ("gestione_id", id.as_str()),
            ("csv_text", "Nome;Telefono\nMario;333123456\nAnna;444\n"),
            ("mapping_json", MAPPING),
        ],
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["inserted"], 1);
    assert_eq!(json["skipped"], 1);
}

#[tokio::test]
async fn save_mapping_default_then_import_without_mapping() {
    let app = TestApp::new();
    let id = app.create_gestione("Rinnovi");
    let csv = "Nominativo;Recapito\nMario;333\n";

    post_multipart(
        app.router(),
        "/api/gestione/import",
        &[
            ("gestione_id", id.as_str()),
            ("csv_text", csv),
            ("mapping_json", r#"{"Nominativo":"nome","Recapito":"telefono"}"#),
            ("save_mapping_default", "1"),
        ],
    )
    .await;

    let response = post_multipart(
        app.router(),
        "/api/gestione/import",
        &[
            ("gestione_id", id.as_str()),
            ("csv_text", "Nominativo;Recapito\nLuca;444\n"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let items = app.state.ctx.gestione_service.items(&id).unwrap();
    let luca = items.iter().find(|i| i.nome.as_deref() == Some("Luca")).unwrap();
    assert_eq!(luca.telefono.as_deref(), Some("444"));
}

#[tokio::test]
async fn preview_returns_items_without_writing() {
    let app = TestApp::new();
    let id = app.create_gestione("Rinnovi");

    let response = post_multipart(
        app.router(),
        "/api/gestione/import",
        &[
            ("gestione_id", id.as_str()),
            ("csv_text", CSV),
            ("mapping_json", MAPPING),
            ("preview", "1"),
        ],
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["preview"], true);
    assert_eq!(json["inserted"], 0);
    assert_eq!(json["items"][0]["nome"], "Mario");
    assert_eq!(json["items"][1]["telefono"], serde_json::Value::Null);
    assert_eq!(app.state.ctx.repository.count_items(&id).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_gestione_id_is_bad_request() {
    let app = TestApp::new();

    let response =
        post_multipart(app.router(), "/api/gestione/import", &[("csv_text", CSV)]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("gestione_id"));
}

#[tokio::test]
async fn empty_csv_is_bad_request() {
    let app = TestApp::new();
    let id = app.create_gestione("Rinnovi");

    let response = post_multipart(
        app.router(),
        "/api/gestione/import",
        &[("gestione_id", id.as_str()), ("csv_text", "  ")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_mapping_json_is_bad_request() {
    let app = TestApp::new();
    let id = app.create_gestione("Rinnovi");

    let response = post_multipart(
        app.router(),
        "/api/gestione/import",
        &[("gestione_id", id.as_str()), ("csv_text", CSV), ("mapping_json", "[1,2]")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.state.ctx.repository.count_items(&id).unwrap(), 0);
}

#[tokio::test]
async fn unknown_gestione_is_not_found() {
    let app = TestApp::new();

    let response = post_multipart(
        app.router(),
        "/api/gestione/import",
        &[("gestione_id", "does-not-exist"), ("csv_text", CSV)],
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}
