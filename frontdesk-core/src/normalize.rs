//! Field normalizers for imported values
//!
//! Every normalizer is a pure function. Bad input never fails the import: it
//! degrades to `None` (or `false` for flags) and the record is kept.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use crate::domain::{ItemField, NormalizedItem, Outcome};
use crate::mapping::MappedRecord;

/// `DD/MM/YYYY` or `DD-MM-YYYY`, zero padding optional
static DAY_FIRST_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("valid day-first date regex")
});

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid ISO date regex")
});

/// Tokens accepted as "yes" in flag columns (compared lowercased)
const TRUTHY: &[&str] = &["1", "true", "si", "sì", "y", "yes", "x"];

/// Formats tried when the value is neither day-first nor ISO
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Trimmed text, empty -> None
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Digits only, keeping a leading `+`
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if trimmed.starts_with('+') {
        Some(format!("+{}", digits))
    } else {
        Some(digits)
    }
}

/// Date-only value, no timezone interpretation
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = DAY_FIRST_DATE.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if ISO_DATE.is_match(s) {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(date);
        }
    }

    parse_date_fallback(s)
}

fn parse_date_fallback(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

/// Case-insensitive truthy vocabulary; anything else is false
pub fn parse_flag(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    TRUTHY.contains(&lowered.as_str())
}

/// Flag coercion for loosely typed values (JSON payloads, native booleans)
pub fn normalize_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => parse_flag(s),
        Value::Number(n) => parse_flag(&n.to_string()),
        _ => false,
    }
}

/// Uppercased value if it is one of the known outcomes
pub fn normalize_outcome(raw: &str) -> Option<Outcome> {
    raw.trim().to_uppercase().parse().ok()
}

/// Normalize every mapped field of a record
pub fn normalize_record(record: &MappedRecord) -> NormalizedItem {
    let mut item = NormalizedItem::default();
    for (field, raw) in record.iter() {
        apply_field(&mut item, field, raw);
    }
    item
}

fn apply_field(item: &mut NormalizedItem, field: ItemField, raw: &str) {
    match field {
        ItemField::Nome => item.nome = Some(normalize_text(raw)),
        ItemField::Cognome => item.cognome = Some(normalize_text(raw)),
        ItemField::Telefono => item.telefono = Some(normalize_phone(raw)),
        ItemField::Scadenza => item.scadenza = Some(normalize_date(raw)),
        ItemField::TipoAbbonamentoCorrente => {
            item.tipo_abbonamento_corrente = Some(normalize_text(raw))
        }
        ItemField::Contattato => item.contattato = Some(parse_flag(raw)),
        ItemField::PresoAppuntamento => item.preso_appuntamento = Some(parse_flag(raw)),
        ItemField::ConsulenzaFatta => item.consulenza_fatta = Some(parse_flag(raw)),
        ItemField::DataConsulenza => item.data_consulenza = Some(normalize_date(raw)),
        ItemField::Esito => item.esito = Some(normalize_outcome(raw)),
        ItemField::NuovoAbbonamentoName => item.nuovo_abbonamento_name = Some(normalize_text(raw)),
        ItemField::DataRisposta => item.data_risposta = Some(normalize_date(raw)),
        ItemField::Note => item.note = Some(normalize_text(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn iso(raw: &str) -> Option<String> {
        normalize_date(raw).map(|d| d.to_string())
    }

    #[test]
    fn test_text() {
        assert_eq!(normalize_text("  Mario "), Some("Mario".to_string()));
        assert_eq!(normalize_text("   "), None);
        assert_eq!(normalize_text(""), None);
    }

    #[test]
    fn test_phone() {
        assert_eq!(normalize_phone("333 123 456"), Some("333123456".to_string()));
        assert_eq!(normalize_phone("+39 (333) 12-34"), Some("+393331234".to_string()));
        assert_eq!(normalize_phone("333+123"), Some("333123".to_string()));
        assert_eq!(normalize_phone("n/d"), None);
        assert_eq!(normalize_phone("+"), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn test_date_day_first() {
        assert_eq!(iso("05/03/2024"), Some("2024-03-05".to_string()));
        assert_eq!(iso("5-3-2024"), Some("2024-03-05".to_string()));
        assert_eq!(iso("31/12/2023"), Some("2023-12-31".to_string()));
    }

    #[test]
    fn test_date_iso_unchanged() {
        assert_eq!(iso("2024-03-05"), Some("2024-03-05".to_string()));
    }

    #[test]
    fn test_date_iso_without_padding() {
        assert_eq!(iso("2024-3-5"), Some("2024-03-05".to_string()));
        assert_eq!(iso("2024-12-1"), Some("2024-12-01".to_string()));
        assert_eq!(iso("2024-13-1"), None);
    }

    #[test]
    fn test_date_fallback_formats() {
        assert_eq!(iso("2024/03/05"), Some("2024-03-05".to_string()));
        assert_eq!(iso("2024-03-05T10:30:00Z"), Some("2024-03-05".to_string()));
        assert_eq!(iso("2024-03-05 10:30:00"), Some("2024-03-05".to_string()));
        assert_eq!(iso("March 5, 2024"), Some("2024-03-05".to_string()));
    }

    #[test]
    fn test_date_invalid() {
        assert_eq!(iso("not-a-date"), None);
        assert_eq!(iso(""), None);
        assert_eq!(iso("31/02/2024"), None);
    }

    #[test]
    fn test_flags() {
        for yes in ["Sì", "si", "x", "X", "1", "true", "TRUE", "y", "Yes"] {
            assert!(parse_flag(yes), "{yes} should be truthy");
        }
        for no in ["no", "", "0", "false", "forse"] {
            assert!(!parse_flag(no), "{no} should be falsy");
        }
    }

    #[test]
    fn test_boolean_values() {
        assert!(normalize_boolean(&json!(true)));
        assert!(normalize_boolean(&json!("Sì")));
        assert!(normalize_boolean(&json!(1)));
        assert!(!normalize_boolean(&json!(0)));
        assert!(!normalize_boolean(&json!(false)));
        assert!(!normalize_boolean(&json!(null)));
    }

    #[test]
    fn test_outcome() {
        assert_eq!(normalize_outcome("rinnovo"), Some(Outcome::Rinnovo));
        assert_eq!(normalize_outcome(" in_attesa "), Some(Outcome::InAttesa));
        assert_eq!(normalize_outcome("qualcosa"), None);
        assert_eq!(normalize_outcome(""), None);
    }

    #[test]
    fn test_normalize_record_only_sets_mapped_fields() {
        let mut record = MappedRecord::default();
        record.set(ItemField::Nome, " Mario ");
        record.set(ItemField::Telefono, "");
        record.set(ItemField::Contattato, "sì");
        record.set(ItemField::Esito, "boh");

        let item = normalize_record(&record);
        assert_eq!(item.nome, Some(Some("Mario".to_string())));
        assert_eq!(item.telefono, Some(None));
        assert_eq!(item.contattato, Some(true));
        assert_eq!(item.esito, Some(None));
        assert_eq!(item.cognome, None);
        assert_eq!(item.scadenza, None);
    }
}
