//! Import command - CSV import into a gestione

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;

use super::{block_on, get_context, get_logger, log_event};
use crate::output;
use frontdesk_core::services::{ImportRequest, ImportResult, LogEvent, MappingSource};
use frontdesk_core::{ColumnMapping, ItemField, NormalizedItem};

const PREVIEW_ROWS: usize = 10;

pub struct ImportArgs {
    pub file: PathBuf,
    pub gestione_id: String,
    pub mapping: Option<String>,
    pub map: Vec<String>,
    pub save_mapping_default: bool,
    /// `None` uses the configured default
    pub skip_duplicates: Option<bool>,
    pub preview: bool,
    pub json: bool,
}

pub fn run(args: ImportArgs) -> Result<()> {
    let logger = get_logger();
    log_event(
        &logger,
        LogEvent::new("command_started")
            .with_command("import")
            .with_gestione(args.gestione_id.clone()),
    );

    let result = import(&args);

    match &result {
        Ok(r) => {
            let event = if r.preview {
                "import_previewed"
            } else {
                "import_completed"
            };
            log_event(
                &logger,
                LogEvent::new(event)
                    .with_command("import")
                    .with_gestione(args.gestione_id.clone())
                    .with_detail(format!(
                        "inserted={} skipped={} total={}",
                        r.inserted, r.skipped, r.total
                    )),
            );
        }
        Err(e) => log_event(
            &logger,
            LogEvent::new("import_failed")
                .with_command("import")
                .with_gestione(args.gestione_id.clone())
                .with_error(e.to_string()),
        ),
    }

    let result = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn import(args: &ImportArgs) -> Result<ImportResult> {
    let csv_text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let mapping = resolve_mapping(args.mapping.as_deref(), &args.map)?;

    let ctx = get_context()?;
    let request = ImportRequest {
        gestione_id: args.gestione_id.clone(),
        csv_text,
        mapping,
        save_mapping_default: args.save_mapping_default,
        skip_duplicates: args
            .skip_duplicates
            .unwrap_or(ctx.config.skip_duplicates_default),
        preview: args.preview,
    };

    Ok(block_on(ctx.import_service.import(request))??)
}

/// Build the request mapping from `--mapping` JSON or `--map` pairs
pub fn resolve_mapping(json: Option<&str>, pairs: &[String]) -> Result<Option<ColumnMapping>> {
    if let Some(json) = json {
        return Ok(Some(ColumnMapping::from_json(json)?));
    }
    if pairs.is_empty() {
        return Ok(None);
    }
    parse_map_pairs(pairs).map(Some)
}

/// Parse repeated `Header=field` arguments
pub fn parse_map_pairs(pairs: &[String]) -> Result<ColumnMapping> {
    let mut mapping = ColumnMapping::new();
    for pair in pairs {
        let (header, field) = pair
            .rsplit_once('=')
            .ok_or_else(|| anyhow!("Invalid --map '{}': expected Header=field", pair))?;
        if header.trim().is_empty() {
            return Err(anyhow!("Invalid --map '{}': empty header", pair));
        }
        let field: ItemField = field
            .parse()
            .map_err(|e: String| anyhow!("Invalid --map '{}': {}", pair, e))?;
        mapping.insert(header, field);
    }
    Ok(mapping)
}

fn print_result(result: &ImportResult) {
    let source = match result.mapping_source {
        MappingSource::Request => "from arguments",
        MappingSource::Stored => "gestione default",
        MappingSource::Suggested => "suggested from headers",
    };

    if result.preview {
        output::info(&format!(
            "Preview: {} rows would be considered ({} duplicates, {} empty)",
            result.total, result.duplicates, result.empty
        ));
        println!("Mapping ({}): {}", source, result.mapping.to_json());

        if !result.items.is_empty() {
            println!();
            let mut table = output::create_table();
            table.set_header(vec!["Nome", "Cognome", "Telefono", "Scadenza", "Esito", "Note"]);
            for item in result.items.iter().take(PREVIEW_ROWS) {
                table.add_row(preview_row(item));
            }
            println!("{table}");
            if result.items.len() > PREVIEW_ROWS {
                println!("... and {} more", result.items.len() - PREVIEW_ROWS);
            }
        }
        println!();
        println!("{}", "Run without --preview to import.".dimmed());
        return;
    }

    output::success(&format!("Imported {} rows", result.inserted));
    if result.skipped > 0 {
        output::warning(&format!(
            "Skipped {} rows ({} duplicates, {} empty)",
            result.skipped, result.duplicates, result.empty
        ));
    }
    println!("Mapping ({}): {}", source, result.mapping.to_json());
}

fn preview_row(item: &NormalizedItem) -> Vec<String> {
    let text = |v: &Option<Option<String>>| output::cell(v.as_ref().and_then(|s| s.as_deref()));
    vec![
        text(&item.nome),
        text(&item.cognome),
        text(&item.telefono),
        item.scadenza
            .flatten()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
        item.esito
            .flatten()
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string()),
        text(&item.note),
    ]
}
