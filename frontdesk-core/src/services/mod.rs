//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod gestione;
pub mod import;
pub mod logging;
pub mod migration;

pub use gestione::{GestioneService, GestioneSummary};
pub use import::{ImportRequest, ImportResult, ImportService, MappingSource};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
