//! Items command - list or export the items of a gestione

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::get_context;
use crate::output;
use frontdesk_core::GestioneItem;

pub fn run(gestione_id: &str, json: bool, csv: Option<PathBuf>) -> Result<()> {
    let ctx = get_context()?;

    if let Some(path) = csv {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let written = ctx
            .gestione_service
            .write_csv(gestione_id, BufWriter::new(file))?;
        output::success(&format!("Wrote {} items to {}", written, path.display()));
        return Ok(());
    }

    let items = ctx.gestione_service.items(gestione_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No items in this gestione.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec![
        "Nome",
        "Cognome",
        "Telefono",
        "Scadenza",
        "Abbonamento",
        "Contattato",
        "Appuntamento",
        "Consulenza",
        "Esito",
    ]);
    for item in &items {
        table.add_row(item_row(item));
    }
    println!("{table}");
    println!("{} items", items.len());
    Ok(())
}

fn item_row(item: &GestioneItem) -> Vec<String> {
    vec![
        output::cell(item.nome.as_deref()),
        output::cell(item.cognome.as_deref()),
        output::cell(item.telefono.as_deref()),
        item.scadenza
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "-".to_string()),
        output::cell(item.tipo_abbonamento_corrente.as_deref()),
        output::yes_no(item.contattato).to_string(),
        output::yes_no(item.preso_appuntamento).to_string(),
        output::yes_no(item.consulenza_fatta).to_string(),
        item.esito
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]
}
