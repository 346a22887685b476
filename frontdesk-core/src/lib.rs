//! Frontdesk Core - consultation funnel tracking for a gym front desk
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Gestione, GestioneItem, ColumnMapping)
//! - **ports**: Trait definitions for external dependencies (GestioneStore)
//! - **services**: Business logic orchestration (import, management, event log)
//! - **adapters**: Concrete implementations (DuckDB)
//!
//! The CSV pipeline itself is made of pure functions in `delimited`,
//! `mapping` and `normalize`.

pub mod adapters;
pub mod config;
pub mod delimited;
pub mod domain;
pub mod log_migrations;
pub mod mapping;
pub mod migrations;
pub mod normalize;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::{GestioneService, ImportService};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{ColumnMapping, Gestione, GestioneItem, ItemField, NormalizedItem, Outcome};
pub use ports::GestioneStore;

/// Database file inside the data directory
pub const DB_FILENAME: &str = "frontdesk.duckdb";

/// Main context for front-desk operations
///
/// Holds the database connection, configuration, and all services. The CLI
/// builds one per invocation; the server builds one at startup.
pub struct FrontdeskContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub import_service: ImportService,
    pub gestione_service: GestioneService,
}

impl FrontdeskContext {
    /// Load settings, open the database and run pending migrations
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        std::fs::create_dir_all(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILENAME))?);
        repository.ensure_schema()?;

        Ok(Self::with_repository(config, repository))
    }

    /// Wire services around an already opened repository
    pub fn with_repository(config: Config, repository: Arc<DuckDbRepository>) -> Self {
        let store: Arc<dyn GestioneStore> = repository.clone();
        let import_service = ImportService::with_batch_size(store, config.batch_size);
        let gestione_service = GestioneService::new(Arc::clone(&repository));

        Self {
            config,
            repository,
            import_service,
            gestione_service,
        }
    }
}
