//! Gestione service - gestione management, item listing and CSV export

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::delimited;
use crate::domain::result::{Error, Result};
use crate::domain::{ColumnMapping, Gestione, GestioneItem, ItemField};
use crate::mapping;

/// Gestione with its item count, for listings
#[derive(Debug, Clone, Serialize)]
pub struct GestioneSummary {
    #[serde(flatten)]
    pub gestione: Gestione,
    pub item_count: i64,
}

pub struct GestioneService {
    repository: Arc<DuckDbRepository>,
}

impl GestioneService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn create(&self, name: &str, description: Option<&str>) -> Result<Gestione> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name is required"));
        }

        let mut gestione = Gestione::new(Uuid::new_v4().to_string(), name.to_string());
        gestione.description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        self.repository.create_gestione(&gestione)?;
        tracing::info!(gestione_id = %gestione.id, "gestione created");
        Ok(gestione)
    }

    pub fn list(&self) -> Result<Vec<GestioneSummary>> {
        self.repository
            .list_gestioni()?
            .into_iter()
            .map(|gestione| -> Result<GestioneSummary> {
                let item_count = self.repository.count_items(&gestione.id)?;
                Ok(GestioneSummary { gestione, item_count })
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<Gestione> {
        self.repository
            .get_gestione(id)?
            .ok_or_else(|| Error::not_found(format!("Gestione not found: {}", id)))
    }

    /// Delete a gestione together with its items
    pub fn delete(&self, id: &str) -> Result<()> {
        if !self.repository.delete_gestione(id)? {
            return Err(Error::not_found(format!("Gestione not found: {}", id)));
        }
        tracing::info!(gestione_id = %id, "gestione deleted");
        Ok(())
    }

    pub fn items(&self, id: &str) -> Result<Vec<GestioneItem>> {
        self.get(id)?;
        self.repository.get_items(id)
    }

    pub fn default_mapping(&self, id: &str) -> Result<Option<ColumnMapping>> {
        Ok(self.get(id)?.default_mapping)
    }

    /// Replace (or clear, with `None`) the stored default mapping
    pub fn set_default_mapping(&self, id: &str, mapping: Option<&ColumnMapping>) -> Result<()> {
        self.repository.update_default_mapping(id, mapping)
    }

    /// Mapping guessed from the header row of `csv_text`
    pub fn suggest_mapping(&self, csv_text: &str) -> Result<ColumnMapping> {
        if csv_text.trim().is_empty() {
            return Err(Error::validation("csv_text is empty"));
        }
        let parsed = delimited::parse(csv_text);
        Ok(mapping::suggest_mapping(&parsed.headers))
    }

    /// Mapping for the headers of `csv_text` in the context of a gestione.
    ///
    /// The stored default mapping wins for the headers it covers; the
    /// suggestion fills in the rest.
    pub fn suggest_mapping_for(&self, id: &str, csv_text: &str) -> Result<ColumnMapping> {
        let stored = self.default_mapping(id)?.unwrap_or_default();
        if csv_text.trim().is_empty() {
            return Err(Error::validation("csv_text is empty"));
        }
        let headers = delimited::parse(csv_text).headers;
        let suggested = mapping::suggest_mapping(&headers);

        let mut result = ColumnMapping::new();
        for header in &headers {
            if let Some(field) = stored.field_for(header).or_else(|| suggested.field_for(header)) {
                result.insert(header.clone(), field);
            }
        }
        Ok(result)
    }

    /// Write the items of a gestione as comma-separated CSV.
    ///
    /// The header row uses the field keys, so the output re-imports with
    /// the suggested mapping.
    pub fn write_csv<W: Write>(&self, id: &str, writer: W) -> Result<usize> {
        let items = self.items(id)?;
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(ItemField::ALL.iter().map(|f| f.as_str()))?;
        for item in &items {
            csv_writer.write_record(item_cells(item))?;
        }
        csv_writer.flush()?;
        Ok(items.len())
    }

    pub fn export_csv(&self, id: &str) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(id, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Other(e.to_string()))
    }
}

/// Cells in `ItemField::ALL` order
fn item_cells(item: &GestioneItem) -> Vec<String> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let date = |v: &Option<chrono::NaiveDate>| v.map(|d| d.to_string()).unwrap_or_default();
    let flag = |v: bool| if v { "true" } else { "false" }.to_string();

    ItemField::ALL
        .iter()
        .map(|field| match field {
            ItemField::Nome => text(&item.nome),
            ItemField::Cognome => text(&item.cognome),
            ItemField::Telefono => text(&item.telefono),
            ItemField::Scadenza => date(&item.scadenza),
            ItemField::TipoAbbonamentoCorrente => text(&item.tipo_abbonamento_corrente),
            ItemField::Contattato => flag(item.contattato),
            ItemField::PresoAppuntamento => flag(item.preso_appuntamento),
            ItemField::ConsulenzaFatta => flag(item.consulenza_fatta),
            ItemField::DataConsulenza => date(&item.data_consulenza),
            ItemField::Esito => item.esito.map(|e| e.to_string()).unwrap_or_default(),
            ItemField::NuovoAbbonamentoName => text(&item.nuovo_abbonamento_name),
            ItemField::DataRisposta => date(&item.data_risposta),
            ItemField::Note => text(&item.note),
        })
        .collect()
}
