//! Frontdesk CLI - gym front desk imports in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod output;

use commands::{gestione, import, items, logs, serve};

/// Frontdesk - consultation funnel imports for the gym front desk
#[derive(Parser)]
#[command(name = "fd", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage gestioni
    Gestione {
        #[command(subcommand)]
        command: gestione::GestioneCommands,
    },

    /// Import a CSV file into a gestione
    Import {
        /// Path to CSV file
        file: PathBuf,
        /// Gestione to import into
        #[arg(long)]
        gestione_id: String,
        /// Column mapping as a JSON object ({"Header": "field", ...})
        #[arg(long, conflicts_with = "map")]
        mapping: Option<String>,
        /// Map one column (Header=field), repeatable
        #[arg(long, value_name = "HEADER=FIELD")]
        map: Vec<String>,
        /// Store the mapping as the gestione's default
        #[arg(long)]
        save_mapping_default: bool,
        /// Skip rows whose phone is already in the gestione
        #[arg(long, conflicts_with = "allow_duplicates")]
        skip_duplicates: bool,
        /// Import rows even if their phone is already in the gestione
        #[arg(long)]
        allow_duplicates: bool,
        /// Preview without importing
        #[arg(long)]
        preview: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the items of a gestione
    Items {
        /// Gestione ID
        gestione_id: String,
        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        /// Write the items as CSV to a file
        #[arg(long, value_name = "OUT")]
        csv: Option<PathBuf>,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides settings)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides settings)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Gestione { command } => gestione::run(command),
        Commands::Import {
            file,
            gestione_id,
            mapping,
            map,
            save_mapping_default,
            skip_duplicates,
            allow_duplicates,
            preview,
            json,
        } => import::run(import::ImportArgs {
            file,
            gestione_id,
            mapping,
            map,
            save_mapping_default,
            skip_duplicates: if allow_duplicates {
                Some(false)
            } else if skip_duplicates {
                Some(true)
            } else {
                None
            },
            preview,
            json,
        }),
        Commands::Items {
            gestione_id,
            json,
            csv,
        } => items::run(&gestione_id, json, csv),
        Commands::Logs { command } => logs::run(command),
        Commands::Serve { host, port } => serve::run(host, port),
    }
}
