//! Gestione item domain model
//!
//! A gestione item is one prospective or existing client tracked through the
//! consultation funnel (contacted, appointment booked, consultation done,
//! outcome).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Destination fields an import mapping can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    Nome,
    Cognome,
    Telefono,
    Scadenza,
    TipoAbbonamentoCorrente,
    Contattato,
    PresoAppuntamento,
    ConsulenzaFatta,
    DataConsulenza,
    Esito,
    NuovoAbbonamentoName,
    DataRisposta,
    Note,
}

impl ItemField {
    /// All fields, in storage column order
    pub const ALL: [ItemField; 13] = [
        ItemField::Nome,
        ItemField::Cognome,
        ItemField::Telefono,
        ItemField::Scadenza,
        ItemField::TipoAbbonamentoCorrente,
        ItemField::Contattato,
        ItemField::PresoAppuntamento,
        ItemField::ConsulenzaFatta,
        ItemField::DataConsulenza,
        ItemField::Esito,
        ItemField::NuovoAbbonamentoName,
        ItemField::DataRisposta,
        ItemField::Note,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemField::Nome => "nome",
            ItemField::Cognome => "cognome",
            ItemField::Telefono => "telefono",
            ItemField::Scadenza => "scadenza",
            ItemField::TipoAbbonamentoCorrente => "tipo_abbonamento_corrente",
            ItemField::Contattato => "contattato",
            ItemField::PresoAppuntamento => "preso_appuntamento",
            ItemField::ConsulenzaFatta => "consulenza_fatta",
            ItemField::DataConsulenza => "data_consulenza",
            ItemField::Esito => "esito",
            ItemField::NuovoAbbonamentoName => "nuovo_abbonamento_name",
            ItemField::DataRisposta => "data_risposta",
            ItemField::Note => "note",
        }
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown field: {}", s))
    }
}

/// Consultation outcome (esito)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Rinnovo,
    Upgrade,
    Downgrade,
    NonRinnova,
    InAttesa,
}

impl Outcome {
    pub const ALL: [Outcome; 5] = [
        Outcome::Rinnovo,
        Outcome::Upgrade,
        Outcome::Downgrade,
        Outcome::NonRinnova,
        Outcome::InAttesa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Rinnovo => "RINNOVO",
            Outcome::Upgrade => "UPGRADE",
            Outcome::Downgrade => "DOWNGRADE",
            Outcome::NonRinnova => "NON_RINNOVA",
            Outcome::InAttesa => "IN_ATTESA",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    /// Exact match against the literal outcome names (already uppercased)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::ALL
            .iter()
            .copied()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| format!("Unknown outcome: {}", s))
    }
}

/// A record after column mapping and normalization, before it is written.
///
/// The outer `Option` tells whether the column was mapped at all; the inner
/// one whether the mapped value survived normalization. Booleans never
/// normalize to null, so they carry a single `Option`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognome: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scadenza: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_abbonamento_corrente: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contattato: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preso_appuntamento: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consulenza_fatta: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_consulenza: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub esito: Option<Option<Outcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nuovo_abbonamento_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_risposta: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
}

impl NormalizedItem {
    /// Normalized phone number, if the column was mapped and non-empty
    pub fn phone(&self) -> Option<&str> {
        self.telefono.as_ref().and_then(|p| p.as_deref())
    }

    /// Whether the field was present in the mapping
    pub fn is_mapped(&self, field: ItemField) -> bool {
        match field {
            ItemField::Nome => self.nome.is_some(),
            ItemField::Cognome => self.cognome.is_some(),
            ItemField::Telefono => self.telefono.is_some(),
            ItemField::Scadenza => self.scadenza.is_some(),
            ItemField::TipoAbbonamentoCorrente => self.tipo_abbonamento_corrente.is_some(),
            ItemField::Contattato => self.contattato.is_some(),
            ItemField::PresoAppuntamento => self.preso_appuntamento.is_some(),
            ItemField::ConsulenzaFatta => self.consulenza_fatta.is_some(),
            ItemField::DataConsulenza => self.data_consulenza.is_some(),
            ItemField::Esito => self.esito.is_some(),
            ItemField::NuovoAbbonamentoName => self.nuovo_abbonamento_name.is_some(),
            ItemField::DataRisposta => self.data_risposta.is_some(),
            ItemField::Note => self.note.is_some(),
        }
    }

    /// True when no mapped value carries information (all null or false)
    pub fn is_empty(&self) -> bool {
        let texts = [
            &self.nome,
            &self.cognome,
            &self.telefono,
            &self.tipo_abbonamento_corrente,
            &self.nuovo_abbonamento_name,
            &self.note,
        ];
        let dates = [&self.scadenza, &self.data_consulenza, &self.data_risposta];
        let flags = [self.contattato, self.preso_appuntamento, self.consulenza_fatta];

        texts.iter().all(|v| v.as_ref().map_or(true, |inner| inner.is_none()))
            && dates.iter().all(|v| v.as_ref().map_or(true, |inner| inner.is_none()))
            && flags.iter().all(|v| !v.unwrap_or(false))
            && self.esito.map_or(true, |inner| inner.is_none())
    }
}

/// A stored gestione item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestioneItem {
    pub id: String,
    pub gestione_id: String,
    pub nome: Option<String>,
    pub cognome: Option<String>,
    pub telefono: Option<String>,
    pub scadenza: Option<NaiveDate>,
    pub tipo_abbonamento_corrente: Option<String>,
    pub contattato: bool,
    pub preso_appuntamento: bool,
    pub consulenza_fatta: bool,
    pub data_consulenza: Option<NaiveDate>,
    pub esito: Option<Outcome>,
    pub nuovo_abbonamento_name: Option<String>,
    pub data_risposta: Option<NaiveDate>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GestioneItem {
    /// Build the row that gets written for a normalized record.
    /// Unmapped columns take the column defaults (null / false).
    pub fn from_normalized(id: String, gestione_id: &str, item: &NormalizedItem) -> Self {
        Self {
            id,
            gestione_id: gestione_id.to_string(),
            nome: item.nome.clone().flatten(),
            cognome: item.cognome.clone().flatten(),
            telefono: item.telefono.clone().flatten(),
            scadenza: item.scadenza.flatten(),
            tipo_abbonamento_corrente: item.tipo_abbonamento_corrente.clone().flatten(),
            contattato: item.contattato.unwrap_or(false),
            preso_appuntamento: item.preso_appuntamento.unwrap_or(false),
            consulenza_fatta: item.consulenza_fatta.unwrap_or(false),
            data_consulenza: item.data_consulenza.flatten(),
            esito: item.esito.flatten(),
            nuovo_abbonamento_name: item.nuovo_abbonamento_name.clone().flatten(),
            data_risposta: item.data_risposta.flatten(),
            note: item.note.clone().flatten(),
            created_at: Utc::now(),
        }
    }
}
