//! Column mapping: from positional CSV fields to destination fields

use crate::domain::{ColumnMapping, ItemField};

/// Header patterns per field, most specific field first so that
/// "data consulenza" is claimed before "consulenza fatta" or "nome".
const FIELD_PATTERNS: &[(ItemField, &[&str])] = &[
    (ItemField::DataConsulenza, &["data consulenza", "consultation date"]),
    (ItemField::DataRisposta, &["data risposta", "response date"]),
    (ItemField::ConsulenzaFatta, &["consulenza fatta", "consultation done"]),
    (ItemField::PresoAppuntamento, &["preso appuntamento", "appuntamento", "appointment"]),
    (ItemField::NuovoAbbonamentoName, &["nuovo abbonamento", "new subscription"]),
    (
        ItemField::TipoAbbonamentoCorrente,
        &["tipo abbonamento corrente", "tipo abbonamento", "abbonamento", "subscription"],
    ),
    (ItemField::Scadenza, &["scadenza", "expiry", "expiration"]),
    (ItemField::Contattato, &["contattato", "contacted"]),
    (ItemField::Telefono, &["telefono", "cellulare", "cell", "tel", "phone", "mobile"]),
    (ItemField::Cognome, &["cognome", "surname", "last name", "lastname"]),
    (ItemField::Nome, &["nome", "first name", "firstname", "name"]),
    (ItemField::Esito, &["esito", "outcome"]),
    (ItemField::Note, &["note", "notes", "commenti", "comments"]),
];

/// One data row keyed by destination field, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedRecord {
    values: Vec<(ItemField, String)>,
}

impl MappedRecord {
    /// Store a raw value; a later column mapped to the same field replaces
    /// the value and keeps the slot of the first one
    pub fn set(&mut self, field: ItemField, raw: impl Into<String>) {
        let raw = raw.into();
        match self.values.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = raw,
            None => self.values.push((field, raw)),
        }
    }

    pub fn get(&self, field: ItemField) -> Option<&str> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemField, &str)> {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Apply a mapping to one data row.
///
/// Columns whose header isn't mapped are dropped. Rows shorter than the
/// header read as empty strings for the missing cells.
pub fn map_row(headers: &[String], row: &[String], mapping: &ColumnMapping) -> MappedRecord {
    let mut record = MappedRecord::default();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(field) = mapping.field_for(header) {
            let raw = row.get(idx).map(String::as_str).unwrap_or("");
            record.set(field, raw);
        }
    }
    record
}

fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .replace(['_', '-', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best-guess mapping from CSV headers.
///
/// Exact header matches are assigned first, then substring matches. Each
/// header and each field is used at most once.
pub fn suggest_mapping(headers: &[String]) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut assigned: Vec<Option<ItemField>> = vec![None; headers.len()];

    let exact = |h: &str, p: &str| h == p;
    let contains = |h: &str, p: &str| h.contains(p);
    let passes: [&dyn Fn(&str, &str) -> bool; 2] = [&exact, &contains];

    for matches in passes {
        for (field, patterns) in FIELD_PATTERNS {
            if assigned.contains(&Some(*field)) {
                continue;
            }
            let hit = normalized.iter().enumerate().find(|(idx, header)| {
                assigned[*idx].is_none()
                    && !header.is_empty()
                    && patterns.iter().any(|p| matches(header, p))
            });
            if let Some((idx, _)) = hit {
                assigned[idx] = Some(*field);
            }
        }
    }

    let mut mapping = ColumnMapping::new();
    for (header, field) in headers.iter().zip(assigned) {
        if let Some(field) = field {
            mapping.insert(header.clone(), field);
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_map_row_drops_unmapped_columns() {
        let headers = strings(&["Nome", "Età", "Telefono"]);
        let row = strings(&["Mario", "42", "333"]);
        let mapping = ColumnMapping::new()
            .with("Nome", ItemField::Nome)
            .with("Telefono", ItemField::Telefono);

        let record = map_row(&headers, &row, &mapping);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get(ItemField::Nome), Some("Mario"));
        assert_eq!(record.get(ItemField::Telefono), Some("333"));
    }

    #[test]
    fn test_map_row_short_row_reads_empty() {
        let headers = strings(&["Nome", "Telefono"]);
        let row = strings(&["Luca"]);
        let mapping = ColumnMapping::new()
            .with("Nome", ItemField::Nome)
            .with("Telefono", ItemField::Telefono);

        let record = map_row(&headers, &row, &mapping);
        assert_eq!(record.get(ItemField::Telefono), Some(""));
    }

    #[test]
    fn test_map_row_rightmost_column_wins_for_shared_field() {
        let headers = strings(&["Cell", "Tel fisso"]);
        let row = strings(&["333", "06123"]);
        let mapping = ColumnMapping::new()
            .with("Cell", ItemField::Telefono)
            .with("Tel fisso", ItemField::Telefono);

        let record = map_row(&headers, &row, &mapping);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get(ItemField::Telefono), Some("06123"));
    }

    #[test]
    fn test_map_row_keeps_header_order() {
        let headers = strings(&["Telefono", "Note", "Nome"]);
        let row = strings(&["333", "ok", "Mario"]);
        let mapping = ColumnMapping::new()
            .with("Nome", ItemField::Nome)
            .with("Note", ItemField::Note)
            .with("Telefono", ItemField::Telefono);

        let fields: Vec<ItemField> = map_row(&headers, &row, &mapping)
            .iter()
            .map(|(f, _)| f)
            .collect();
        assert_eq!(fields, vec![ItemField::Telefono, ItemField::Note, ItemField::Nome]);
    }

    #[test]
    fn test_suggest_mapping_italian_export() {
        let headers = strings(&[
            "Nome",
            "Cognome",
            "Cellulare",
            "Scadenza",
            "Tipo abbonamento",
            "Contattato",
            "Data consulenza",
            "Consulenza fatta",
            "Esito",
            "Note",
        ]);
        let mapping = suggest_mapping(&headers);

        assert_eq!(mapping.field_for("Nome"), Some(ItemField::Nome));
        assert_eq!(mapping.field_for("Cognome"), Some(ItemField::Cognome));
        assert_eq!(mapping.field_for("Cellulare"), Some(ItemField::Telefono));
        assert_eq!(mapping.field_for("Scadenza"), Some(ItemField::Scadenza));
        assert_eq!(
            mapping.field_for("Tipo abbonamento"),
            Some(ItemField::TipoAbbonamentoCorrente)
        );
        assert_eq!(mapping.field_for("Contattato"), Some(ItemField::Contattato));
        assert_eq!(mapping.field_for("Data consulenza"), Some(ItemField::DataConsulenza));
        assert_eq!(mapping.field_for("Consulenza fatta"), Some(ItemField::ConsulenzaFatta));
        assert_eq!(mapping.field_for("Esito"), Some(ItemField::Esito));
        assert_eq!(mapping.field_for("Note"), Some(ItemField::Note));
        // Header order is kept
        assert_eq!(mapping.entries()[0].0, "Nome");
    }

    #[test]
    fn test_suggest_mapping_accepts_field_keys() {
        let headers = strings(&["nome", "telefono", "data_risposta", "nuovo_abbonamento_name"]);
        let mapping = suggest_mapping(&headers);
        assert_eq!(mapping.field_for("data_risposta"), Some(ItemField::DataRisposta));
        assert_eq!(
            mapping.field_for("nuovo_abbonamento_name"),
            Some(ItemField::NuovoAbbonamentoName)
        );
        assert_eq!(mapping.field_for("telefono"), Some(ItemField::Telefono));
    }

    #[test]
    fn test_suggest_mapping_ignores_unknown_headers() {
        let headers = strings(&["Codice", "", "Età"]);
        assert!(suggest_mapping(&headers).is_empty());
    }
}
