//! Store port - the table store behind the import pipeline

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{ColumnMapping, Gestione, GestioneItem};

/// Gestione table store abstraction
///
/// The import pipeline only talks to the store through this trait. Each call
/// is one round trip; callers await them sequentially.
#[async_trait]
pub trait GestioneStore: Send + Sync {
    /// Get a gestione by ID
    async fn find_gestione(&self, id: &str) -> Result<Option<Gestione>>;

    /// Phones among `candidates` already present in the gestione
    async fn existing_phones(
        &self,
        gestione_id: &str,
        candidates: &[String],
    ) -> Result<HashSet<String>>;

    /// Insert one chunk of items as a single batched write.
    ///
    /// Returns the number of rows the store reports as inserted, or `None`
    /// when the store doesn't report counts.
    async fn insert_items(&self, items: &[GestioneItem]) -> Result<Option<usize>>;

    /// Persist the mapping reused by future imports into the gestione
    async fn save_default_mapping(&self, gestione_id: &str, mapping: &ColumnMapping)
        -> Result<()>;
}
