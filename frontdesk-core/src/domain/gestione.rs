//! Gestione domain model and import column mappings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::item::ItemField;
use super::result::{Error, Result};

/// A named batch under which consultation-funnel items are organized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gestione {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Mapping reused by imports that don't supply one
    pub default_mapping: Option<ColumnMapping>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gestione {
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description: None,
            default_mapping: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Source CSV header -> destination field, in insertion order.
///
/// Serialized as a JSON object (`{"Nome": "nome", ...}`), which is also the
/// shape accepted by the `mapping_json` request field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ColumnMapping {
    entries: Vec<(String, ItemField)>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a header to a field, replacing an earlier entry for the same header
    pub fn insert(&mut self, header: impl Into<String>, field: ItemField) {
        let header = header.into().trim().to_string();
        if let Some(entry) = self.entries.iter_mut().find(|(h, _)| *h == header) {
            entry.1 = field;
        } else {
            self.entries.push((header, field));
        }
    }

    pub fn with(mut self, header: impl Into<String>, field: ItemField) -> Self {
        self.insert(header, field);
        self
    }

    /// Destination field for a header cell
    pub fn field_for(&self, header: &str) -> Option<ItemField> {
        let header = header.trim();
        self.entries
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, f)| *f)
    }

    pub fn entries(&self) -> &[(String, ItemField)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a `mapping_json` payload.
    ///
    /// The payload must be a JSON object whose values are strings. Values that
    /// don't name a known destination field are ignored.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::validation(format!("mapping_json is not valid JSON: {}", e)))?;
        match value {
            Value::Object(map) => Self::try_from(map),
            Value::Null => Ok(Self::new()),
            _ => Err(Error::validation("mapping_json must be a JSON object")),
        }
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.clone().into()).to_string()
    }
}

impl TryFrom<Map<String, Value>> for ColumnMapping {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut mapping = ColumnMapping::new();
        for (header, value) in map {
            let key = match value {
                Value::String(s) => s,
                Value::Null => continue,
                other => {
                    return Err(Error::validation(format!(
                        "mapping for '{}' must be a string, got {}",
                        header, other
                    )))
                }
            };
            if key.trim().is_empty() {
                continue;
            }
            match key.parse::<ItemField>() {
                Ok(field) => mapping.insert(header, field),
                Err(_) => {
                    tracing::debug!(header = %header, key = %key, "ignoring unknown mapping target");
                }
            }
        }
        Ok(mapping)
    }
}

impl From<ColumnMapping> for Map<String, Value> {
    fn from(mapping: ColumnMapping) -> Self {
        mapping
            .entries
            .into_iter()
            .map(|(h, f)| (h, Value::String(f.as_str().to_string())))
            .collect()
    }
}
