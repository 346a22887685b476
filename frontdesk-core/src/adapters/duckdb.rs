//! DuckDB repository implementation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{params, params_from_iter, Connection};

use crate::domain::result::{Error, Result};
use crate::domain::{ColumnMapping, Gestione, GestioneItem};
use crate::ports::GestioneStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ITEM_COLUMNS: &str = "item_id, gestione_id, nome, cognome, telefono, scadenza::VARCHAR,
    tipo_abbonamento_corrente, contattato, preso_appuntamento, consulenza_fatta,
    data_consulenza::VARCHAR, esito, nuovo_abbonamento_name, data_risposta::VARCHAR, note, created_at";

const GESTIONE_COLUMNS: &str =
    "gestione_id, name, description, default_mapping, created_at, updated_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database file.
    ///
    /// Opening retries with exponential backoff when the file is locked by
    /// another process (e.g. the CLI running while `fd serve` is up).
    /// Statements themselves are never retried.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    attempt += 1;
                    if !is_retryable_error(&err_msg) || attempt >= MAX_RETRIES {
                        return Err(e);
                    }
                    let delay =
                        Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt - 1));
                    tracing::warn!(
                        attempt,
                        max = MAX_RETRIES,
                        delay_ms = delay.as_millis() as u64,
                        error = %err_msg,
                        "database busy, retrying"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// In-memory database, for tests and throwaway previews
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off: nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(format!("{:#}", e)))
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Gestione operations ===

    pub fn create_gestione(&self, gestione: &Gestione) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO gestioni (gestione_id, name, description, default_mapping, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                gestione.id,
                gestione.name,
                gestione.description,
                gestione.default_mapping.as_ref().map(|m| m.to_json()),
                gestione.created_at.to_rfc3339(),
                gestione.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_gestione(&self, id: &str) -> Result<Option<Gestione>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM gestioni WHERE gestione_id = ?",
            GESTIONE_COLUMNS
        ))?;
        let mut rows = stmt.query_map([id], row_to_gestione)?;
        Ok(rows.next().transpose()?)
    }

    /// All gestioni, newest first
    pub fn list_gestioni(&self) -> Result<Vec<Gestione>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM gestioni ORDER BY created_at DESC, name",
            GESTIONE_COLUMNS
        ))?;
        let gestioni = stmt
            .query_map([], row_to_gestione)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(gestioni)
    }

    pub fn update_default_mapping(
        &self,
        gestione_id: &str,
        mapping: Option<&ColumnMapping>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE gestioni SET default_mapping = ?, updated_at = ? WHERE gestione_id = ?",
            params![
                mapping.map(|m| m.to_json()),
                Utc::now().to_rfc3339(),
                gestione_id
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found(format!("Gestione not found: {}", gestione_id)));
        }
        Ok(())
    }

    /// Delete a gestione and all of its items in one transaction
    pub fn delete_gestione(&self, gestione_id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM gestione_items WHERE gestione_id = ?",
            params![gestione_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM gestioni WHERE gestione_id = ?",
            params![gestione_id],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    // === Item operations ===

    /// Items of a gestione in insertion order
    pub fn get_items(&self, gestione_id: &str) -> Result<Vec<GestioneItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM gestione_items WHERE gestione_id = ? ORDER BY created_at, rowid",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map([gestione_id], row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn count_items(&self, gestione_id: &str) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM gestione_items WHERE gestione_id = ?",
            [gestione_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Phones from `candidates` already stored for the gestione, one query
    pub fn find_existing_phones(
        &self,
        gestione_id: &str,
        candidates: &[String],
    ) -> Result<HashSet<String>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }

        let conn = self.lock()?;
        let placeholders = vec!["?"; candidates.len()].join(", ");
        let sql = format!(
            "SELECT DISTINCT telefono FROM gestione_items
             WHERE gestione_id = ? AND telefono IN ({})",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let params = std::iter::once(gestione_id).chain(candidates.iter().map(String::as_str));
        let phones = stmt
            .query_map(params_from_iter(params), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(phones)
    }

    /// Insert a chunk of items in one transaction, all or nothing
    pub fn insert_item_batch(&self, items: &[GestioneItem]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO gestione_items (item_id, gestione_id, nome, cognome, telefono, scadenza,
                                            tipo_abbonamento_corrente, contattato, preso_appuntamento,
                                            consulenza_fatta, data_consulenza, esito,
                                            nuovo_abbonamento_name, data_risposta, note, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for item in items {
                inserted += stmt.execute(params![
                    item.id,
                    item.gestione_id,
                    item.nome,
                    item.cognome,
                    item.telefono,
                    item.scadenza.map(|d| d.to_string()),
                    item.tipo_abbonamento_corrente,
                    item.contattato,
                    item.preso_appuntamento,
                    item.consulenza_fatta,
                    item.data_consulenza.map(|d| d.to_string()),
                    item.esito.map(|e| e.as_str()),
                    item.nuovo_abbonamento_name,
                    item.data_risposta.map(|d| d.to_string()),
                    item.note,
                    item.created_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }
}

#[async_trait]
impl GestioneStore for DuckDbRepository {
    async fn find_gestione(&self, id: &str) -> Result<Option<Gestione>> {
        self.get_gestione(id)
    }

    async fn existing_phones(
        &self,
        gestione_id: &str,
        candidates: &[String],
    ) -> Result<HashSet<String>> {
        self.find_existing_phones(gestione_id, candidates)
    }

    async fn insert_items(&self, items: &[GestioneItem]) -> Result<Option<usize>> {
        self.insert_item_batch(items).map(Some)
    }

    async fn save_default_mapping(
        &self,
        gestione_id: &str,
        mapping: &ColumnMapping,
    ) -> Result<()> {
        self.update_default_mapping(gestione_id, Some(mapping))
    }
}

// Row helpers

fn row_to_gestione(row: &duckdb::Row) -> duckdb::Result<Gestione> {
    let mapping_json: Option<String> = row.get(3)?;
    let created_str: String = row.get(4)?;
    let updated_str: String = row.get(5)?;

    Ok(Gestione {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        // A corrupt stored mapping is treated as no default
        default_mapping: mapping_json.and_then(|s| ColumnMapping::from_json(&s).ok()),
        created_at: parse_timestamp(&created_str),
        updated_at: parse_timestamp(&updated_str),
    })
}

fn row_to_item(row: &duckdb::Row) -> duckdb::Result<GestioneItem> {
    // Column indices from ITEM_COLUMNS:
    // 0: item_id, 1: gestione_id, 2: nome, 3: cognome, 4: telefono, 5: scadenza,
    // 6: tipo_abbonamento_corrente, 7: contattato, 8: preso_appuntamento, 9: consulenza_fatta,
    // 10: data_consulenza, 11: esito, 12: nuovo_abbonamento_name, 13: data_risposta,
    // 14: note, 15: created_at
    let scadenza: Option<String> = row.get(5)?;
    let data_consulenza: Option<String> = row.get(10)?;
    let esito: Option<String> = row.get(11)?;
    let data_risposta: Option<String> = row.get(13)?;
    let created_str: String = row.get(15)?;

    Ok(GestioneItem {
        id: row.get(0)?,
        gestione_id: row.get(1)?,
        nome: row.get(2)?,
        cognome: row.get(3)?,
        telefono: row.get(4)?,
        scadenza: scadenza.as_deref().and_then(parse_date),
        tipo_abbonamento_corrente: row.get(6)?,
        contattato: row.get(7)?,
        preso_appuntamento: row.get(8)?,
        consulenza_fatta: row.get(9)?,
        data_consulenza: data_consulenza.as_deref().and_then(parse_date),
        esito: esito.and_then(|e| e.parse().ok()),
        nuovo_abbonamento_name: row.get(12)?,
        data_risposta: data_risposta.as_deref().and_then(parse_date),
        note: row.get(14)?,
        created_at: parse_timestamp(&created_str),
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
