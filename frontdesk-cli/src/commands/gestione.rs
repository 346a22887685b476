//! Gestione command - create, list and inspect gestioni

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Input};

use super::{get_context, get_logger, log_event};
use crate::output;
use frontdesk_core::services::LogEvent;
use frontdesk_core::ColumnMapping;

#[derive(Subcommand)]
pub enum GestioneCommands {
    /// Create a new gestione
    New {
        /// Gestione name (prompted if omitted)
        name: Option<String>,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List gestioni with their item counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change the default import mapping
    Mapping {
        /// Gestione ID
        id: String,
        /// Store this JSON object as the default mapping
        #[arg(long, conflicts_with_all = ["clear", "suggest"])]
        set: Option<String>,
        /// Remove the default mapping
        #[arg(long, conflicts_with = "suggest")]
        clear: bool,
        /// Suggest a mapping for the headers of a CSV file
        #[arg(long, value_name = "FILE")]
        suggest: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a gestione and its items
    Delete {
        /// Gestione ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: GestioneCommands) -> Result<()> {
    match command {
        GestioneCommands::New {
            name,
            description,
            json,
        } => run_new(name, description, json),
        GestioneCommands::List { json } => run_list(json),
        GestioneCommands::Mapping {
            id,
            set,
            clear,
            suggest,
            json,
        } => run_mapping(&id, set, clear, suggest, json),
        GestioneCommands::Delete { id, force } => run_delete(&id, force),
    }
}

fn run_new(name: Option<String>, description: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let name = match name {
        Some(n) => n,
        None => Input::new().with_prompt("Gestione name").interact_text()?,
    };

    let gestione = ctx
        .gestione_service
        .create(&name, description.as_deref())?;
    log_event(
        &get_logger(),
        LogEvent::new("gestione_created")
            .with_command("gestione new")
            .with_gestione(gestione.id.clone()),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&gestione)?);
    } else {
        output::success("Gestione created");
        println!("  ID: {}", gestione.id);
        println!("  Name: {}", gestione.name);
        if let Some(description) = &gestione.description {
            println!("  Description: {}", description);
        }
    }
    Ok(())
}

fn run_list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let gestioni = ctx.gestione_service.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&gestioni)?);
        return Ok(());
    }

    if gestioni.is_empty() {
        println!("No gestioni yet. Create one with `fd gestione new <name>`.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Name", "Items", "Default mapping", "Created"]);
    for summary in &gestioni {
        let g = &summary.gestione;
        table.add_row(vec![
            g.id.clone(),
            g.name.clone(),
            summary.item_count.to_string(),
            output::yes_no(g.default_mapping.is_some()).to_string(),
            g.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn run_mapping(
    id: &str,
    set: Option<String>,
    clear: bool,
    suggest: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    if let Some(path) = suggest {
        let csv_text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mapping = ctx.gestione_service.suggest_mapping_for(id, &csv_text)?;
        return print_mapping(Some(&mapping), json);
    }

    if let Some(raw) = set {
        let mapping = ColumnMapping::from_json(&raw)?;
        ctx.gestione_service.set_default_mapping(id, Some(&mapping))?;
        log_event(
            &get_logger(),
            LogEvent::new("mapping_saved")
                .with_command("gestione mapping")
                .with_gestione(id),
        );
        if !json {
            output::success("Default mapping saved");
        }
        return print_mapping(Some(&mapping), json);
    }

    if clear {
        ctx.gestione_service.set_default_mapping(id, None)?;
        if json {
            println!("{}", serde_json::json!({"cleared": true}));
        } else {
            output::success("Default mapping cleared");
        }
        return Ok(());
    }

    let mapping = ctx.gestione_service.default_mapping(id)?;
    print_mapping(mapping.as_ref(), json)
}

fn print_mapping(mapping: Option<&ColumnMapping>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&mapping)?);
        return Ok(());
    }

    let Some(mapping) = mapping.filter(|m| !m.is_empty()) else {
        println!("No mapping.");
        return Ok(());
    };

    let mut table = output::create_table();
    table.set_header(vec!["CSV column", "Field"]);
    for (header, field) in mapping.entries() {
        table.add_row(vec![header.clone(), field.to_string()]);
    }
    println!("{table}");
    Ok(())
}

fn run_delete(id: &str, force: bool) -> Result<()> {
    let ctx = get_context()?;
    let gestione = ctx.gestione_service.get(id)?;

    if !force
        && !Confirm::new()
            .with_prompt(format!(
                "Delete gestione '{}' and all its items?",
                gestione.name
            ))
            .default(false)
            .interact()?
    {
        println!("Cancelled.");
        return Ok(());
    }

    ctx.gestione_service.delete(id)?;
    log_event(
        &get_logger(),
        LogEvent::new("gestione_deleted")
            .with_command("gestione delete")
            .with_gestione(id),
    );
    println!("{}", format!("Deleted gestione '{}'", gestione.name).green());
    Ok(())
}
