//! Import service - CSV import into a gestione
//!
//! Raw text goes through delimiter detection, record reassembly, column
//! mapping and field normalization, then the optional duplicate filter and
//! the chunked writer. Store calls are awaited one after the other.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::DEFAULT_BATCH_SIZE;
use crate::delimited;
use crate::domain::result::{Error, Result};
use crate::domain::{ColumnMapping, GestioneItem, NormalizedItem};
use crate::mapping::{map_row, suggest_mapping};
use crate::normalize::normalize_record;
use crate::ports::GestioneStore;

/// One import call
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub gestione_id: String,
    pub csv_text: String,
    /// Header -> field mapping; `None` (or empty) falls back to the stored
    /// default mapping, then to a suggestion from the headers
    pub mapping: Option<ColumnMapping>,
    /// Persist `mapping` as the gestione's default before writing
    pub save_mapping_default: bool,
    pub skip_duplicates: bool,
    /// Run the whole pipeline without writing anything
    pub preview: bool,
}

/// Where the mapping used by an import came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Request,
    Stored,
    Suggested,
}

/// Import result.
///
/// `inserted + skipped == total` always holds; a preview inserts nothing and
/// reports the records it would write in `items`.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub inserted: usize,
    pub skipped: usize,
    /// Normalized records in the input
    pub total: usize,
    /// Records dropped because their phone was already in the gestione
    pub duplicates: usize,
    /// Records with no usable value in any mapped column
    pub empty: usize,
    pub preview: bool,
    pub mapping: ColumnMapping,
    pub mapping_source: MappingSource,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<NormalizedItem>,
}

/// Import service for CSV imports
pub struct ImportService {
    store: Arc<dyn GestioneStore>,
    batch_size: usize,
}

impl ImportService {
    pub fn new(store: Arc<dyn GestioneStore>) -> Self {
        Self::with_batch_size(store, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(store: Arc<dyn GestioneStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Import CSV text into a gestione.
    ///
    /// Input is validated before anything is parsed. The first failing chunk
    /// aborts the import; chunks written before it stay written.
    pub async fn import(&self, request: ImportRequest) -> Result<ImportResult> {
        let gestione_id = request.gestione_id.trim();
        if gestione_id.is_empty() {
            return Err(Error::validation("gestione_id is required"));
        }
        if request.csv_text.trim().is_empty() {
            return Err(Error::validation("csv_text is empty"));
        }

        let gestione = self
            .store
            .find_gestione(gestione_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Gestione not found: {}", gestione_id)))?;

        let explicit = request.mapping.filter(|m| !m.is_empty());
        if let Some(mapping) = &explicit {
            if request.save_mapping_default && !request.preview {
                self.store.save_default_mapping(gestione_id, mapping).await?;
                tracing::debug!(gestione_id, columns = mapping.len(), "saved default mapping");
            }
        }

        let parsed = delimited::parse(&request.csv_text);
        let (mapping, mapping_source) = match (explicit, gestione.default_mapping) {
            (Some(m), _) => (m, MappingSource::Request),
            (None, Some(m)) if !m.is_empty() => (m, MappingSource::Stored),
            _ => (suggest_mapping(&parsed.headers), MappingSource::Suggested),
        };
        tracing::debug!(
            gestione_id,
            delimiter = %parsed.delimiter,
            rows = parsed.rows.len(),
            source = ?mapping_source,
            "parsed csv"
        );

        let normalized: Vec<NormalizedItem> = parsed
            .rows
            .iter()
            .map(|row| normalize_record(&map_row(&parsed.headers, row, &mapping)))
            .collect();
        let total = normalized.len();

        let (mut records, empty_records): (Vec<_>, Vec<_>) =
            normalized.into_iter().partition(|item| !item.is_empty());
        let empty = empty_records.len();

        let mut duplicates = 0;
        if request.skip_duplicates {
            let candidates = distinct_phones(&records);
            if !candidates.is_empty() {
                let existing = self.store.existing_phones(gestione_id, &candidates).await?;
                duplicates = retain_new_phones(&mut records, &existing);
            }
        }

        if request.preview {
            return Ok(ImportResult {
                inserted: 0,
                skipped: total,
                total,
                duplicates,
                empty,
                preview: true,
                mapping,
                mapping_source,
                items: records,
            });
        }

        let mut inserted = 0;
        for (idx, chunk) in records.chunks(self.batch_size).enumerate() {
            let rows: Vec<GestioneItem> = chunk
                .iter()
                .map(|item| GestioneItem::from_normalized(Uuid::new_v4().to_string(), gestione_id, item))
                .collect();
            let written = match self.store.insert_items(&rows).await {
                Ok(count) => count.unwrap_or(rows.len()),
                Err(e) => {
                    tracing::warn!(gestione_id, chunk = idx, inserted, error = %e, "chunk insert failed");
                    return Err(e);
                }
            };
            inserted += written;
        }

        tracing::info!(gestione_id, inserted, total, duplicates, empty, "import completed");

        Ok(ImportResult {
            inserted,
            skipped: total.saturating_sub(inserted),
            total,
            duplicates,
            empty,
            preview: false,
            mapping,
            mapping_source,
            items: Vec::new(),
        })
    }
}

/// Distinct non-empty phones, first occurrence order
fn distinct_phones(records: &[NormalizedItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| r.phone())
        .filter(|p| !p.is_empty() && seen.insert(p.to_string()))
        .map(str::to_string)
        .collect()
}

/// Drop records whose phone is already stored; returns how many were dropped.
/// Records without a phone are always kept.
fn retain_new_phones(records: &mut Vec<NormalizedItem>, existing: &HashSet<String>) -> usize {
    let before = records.len();
    records.retain(|r| r.phone().map_or(true, |p| !existing.contains(p)));
    before - records.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Gestione, ItemField};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockStore {
        gestioni: Vec<Gestione>,
        phones: HashSet<String>,
        inserted: Mutex<Vec<GestioneItem>>,
        chunk_sizes: Mutex<Vec<usize>>,
        lookups: Mutex<usize>,
        saved_mapping: Mutex<Option<ColumnMapping>>,
        fail_on_chunk: Option<usize>,
        report_counts: bool,
    }

    impl MockStore {
        fn with_gestione(id: &str) -> Self {
            Self {
                gestioni: vec![Gestione::new(id.to_string(), "Test".to_string())],
                report_counts: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl GestioneStore for MockStore {
        async fn find_gestione(&self, id: &str) -> Result<Option<Gestione>> {
            Ok(self.gestioni.iter().find(|g| g.id == id).cloned())
        }

        async fn existing_phones(
            &self,
            _gestione_id: &str,
            candidates: &[String],
        ) -> Result<HashSet<String>> {
            *self.lookups.lock().unwrap() += 1;
            Ok(candidates
                .iter()
                .filter(|c| self.phones.contains(*c))
                .cloned()
                .collect())
        }

        async fn insert_items(&self, items: &[GestioneItem]) -> Result<Option<usize>> {
            let mut sizes = self.chunk_sizes.lock().unwrap();
            if self.fail_on_chunk == Some(sizes.len()) {
                return Err(Error::database("connection reset"));
            }
            sizes.push(items.len());
            self.inserted.lock().unwrap().extend_from_slice(items);
            Ok(self.report_counts.then_some(items.len()))
        }

        async fn save_default_mapping(
            &self,
            _gestione_id: &str,
            mapping: &ColumnMapping,
        ) -> Result<()> {
            *self.saved_mapping.lock().unwrap() = Some(mapping.clone());
            Ok(())
        }
    }

    const CSV: &str = "Nome;Telefono\nMario;333123456\nLuca;\n";

    fn name_phone_mapping() -> ColumnMapping {
        ColumnMapping::from_json(r#"{"Nome":"nome","Telefono":"telefono"}"#).unwrap()
    }

    fn request(csv: &str, skip_duplicates: bool) -> ImportRequest {
        ImportRequest {
            gestione_id: "g1".to_string(),
            csv_text: csv.to_string(),
            mapping: Some(name_phone_mapping()),
            skip_duplicates,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_import_inserts_all_records() {
        let store = Arc::new(MockStore::with_gestione("g1"));
        let service = ImportService::new(store.clone());

        let result = service.import(request(CSV, false)).await.unwrap();
        assert_eq!((result.inserted, result.skipped), (2, 0));

        let rows = store.inserted.lock().unwrap();
        assert_eq!(rows[0].nome.as_deref(), Some("Mario"));
        assert_eq!(rows[0].telefono.as_deref(), Some("333123456"));
        assert_eq!(rows[1].nome.as_deref(), Some("Luca"));
        assert_eq!(rows[1].telefono, None);
        assert!(rows.iter().all(|r| r.gestione_id == "g1"));
    }

    #[tokio::test]
    async fn test_import_skips_existing_phone() {
        let mut store = MockStore::with_gestione("g1");
        store.phones.insert("333123456".to_string());
        let store = Arc::new(store);
        let service = ImportService::new(store.clone());

        let result = service.import(request(CSV, true)).await.unwrap();
        assert_eq!((result.inserted, result.skipped), (1, 1));
        assert_eq!(result.duplicates, 1);
        assert_eq!(store.inserted.lock().unwrap()[0].nome.as_deref(), Some("Luca"));
    }

    #[tokio::test]
    async fn test_duplicates_kept_when_skip_disabled() {
        let mut store = MockStore::with_gestione("g1");
        store.phones.insert("333123456".to_string());
        let store = Arc::new(store);
        let service = ImportService::new(store.clone());

        let result = service.import(request(CSV, false)).await.unwrap();
        assert_eq!(result.inserted, 2);
        assert_eq!(*store.lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_no_lookup_without_phones() {
        let store = Arc::new(MockStore::with_gestione("g1"));
        let service = ImportService::new(store.clone());

        let result = service
            .import(request("Nome;Telefono\nAnna;\nLuca;-\n", true))
            .await
            .unwrap();
        assert_eq!(result.inserted, 2);
        assert_eq!(*store.lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validation_before_parsing() {
        let store = Arc::new(MockStore::with_gestione("g1"));
        let service = ImportService::new(store);

        let mut missing_id = request(CSV, false);
        missing_id.gestione_id = "  ".to_string();
        assert!(matches!(service.import(missing_id).await, Err(Error::Validation(_))));

        assert!(matches!(
            service.import(request(" \n ", false)).await,
            Err(Error::Validation(_))
        ));

        let mut unknown = request(CSV, false);
        unknown.gestione_id = "g404".to_string();
        assert!(matches!(service.import(unknown).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_chunks_follow_batch_size() {
        let store = Arc::new(MockStore::with_gestione("g1"));
        let service = ImportService::with_batch_size(store.clone(), 2);

        let csv = "Nome\nA\nB\nC\nD\nE\n";
        let mut req = request(csv, false);
        req.mapping = Some(ColumnMapping::new().with("Nome", ItemField::Nome));

        let result = service.import(req).await.unwrap();
        assert_eq!(result.inserted, 5);
        assert_eq!(*store.chunk_sizes.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_missing_counts_fall_back_to_chunk_length() {
        let mut store = MockStore::with_gestione("g1");
        store.report_counts = false;
        let service = ImportService::new(Arc::new(store));

        let result = service.import(request(CSV, false)).await.unwrap();
        assert_eq!(result.inserted, 2);
    }

    #[tokio::test]
    async fn test_failing_chunk_aborts_but_keeps_earlier_chunks() {
        let mut store = MockStore::with_gestione("g1");
        store.fail_on_chunk = Some(1);
        let store = Arc::new(store);
        let service = ImportService::with_batch_size(store.clone(), 1);

        let err = service.import(request(CSV, false)).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert_eq!(store.inserted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_records_are_skipped() {
        let store = Arc::new(MockStore::with_gestione("g1"));
        let service = ImportService::new(store.clone());

        let result = service
            .import(request("Nome;Telefono;Altro\n;;x\nMario;333\n", false))
            .await
            .unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.empty, 1);
        assert_eq!((result.inserted, result.skipped), (1, 1));
    }

    #[tokio::test]
    async fn test_save_mapping_default_only_for_explicit_mapping() {
        let store = Arc::new(MockStore::with_gestione("g1"));
        let service = ImportService::new(store.clone());

        let mut req = request(CSV, false);
        req.save_mapping_default = true;
        service.import(req).await.unwrap();
        assert_eq!(*store.saved_mapping.lock().unwrap(), Some(name_phone_mapping()));
    }

    #[tokio::test]
    async fn test_stored_mapping_used_when_none_supplied() {
        let mut store = MockStore::with_gestione("g1");
        store.gestioni[0].default_mapping =
            Some(ColumnMapping::new().with("Cell", ItemField::Telefono));
        let store = Arc::new(store);
        let service = ImportService::new(store.clone());

        let mut req = request("Nome;Cell\nMario;333\n", false);
        req.mapping = None;
        let result = service.import(req).await.unwrap();

        assert_eq!(result.mapping_source, MappingSource::Stored);
        let rows = store.inserted.lock().unwrap();
        assert_eq!(rows[0].telefono.as_deref(), Some("333"));
        assert_eq!(rows[0].nome, None);
    }

    #[tokio::test]
    async fn test_suggested_mapping_as_last_resort() {
        let store = Arc::new(MockStore::with_gestione("g1"));
        let service = ImportService::new(store.clone());

        let mut req = request("Nome;Cellulare;Esito\nMario;333;rinnovo\n", false);
        req.mapping = None;
        let result = service.import(req).await.unwrap();

        assert_eq!(result.mapping_source, MappingSource::Suggested);
        let rows = store.inserted.lock().unwrap();
        assert_eq!(rows[0].telefono.as_deref(), Some("333"));
        assert_eq!(rows[0].esito, Some(crate::domain::Outcome::Rinnovo));
    }

    #[tokio::test]
    async fn test_preview_writes_nothing() {
        let mut store = MockStore::with_gestione("g1");
        store.phones.insert("333123456".to_string());
        let store = Arc::new(store);
        let service = ImportService::new(store.clone());

        let mut req = request(CSV, true);
        req.preview = true;
        req.save_mapping_default = true;
        let result = service.import(req).await.unwrap();

        assert!(result.preview);
        assert_eq!(result.inserted, 0);
        assert_eq!(result.inserted + result.skipped, result.total);
        assert_eq!(result.items.len(), 1);
        assert!(store.inserted.lock().unwrap().is_empty());
        assert!(store.saved_mapping.lock().unwrap().is_none());
    }

    #[test]
    fn test_retain_new_phones_keeps_phoneless_records() {
        let with_phone = |p: Option<&str>| NormalizedItem {
            telefono: Some(p.map(str::to_string)),
            ..Default::default()
        };
        let mut records = vec![with_phone(Some("1")), with_phone(None), with_phone(Some("2"))];
        let existing = HashSet::from(["1".to_string()]);

        assert_eq!(retain_new_phones(&mut records, &existing), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phone(), None);
    }

    #[test]
    fn test_distinct_phones_dedups_in_order() {
        let with_phone = |p: &str| NormalizedItem {
            telefono: Some(Some(p.to_string())),
            ..Default::default()
        };
        let records = vec![with_phone("2"), with_phone("1"), with_phone("2")];
        assert_eq!(distinct_phones(&records), vec!["2".to_string(), "1".to_string()]);
    }
}
