//! Delimited text parsing for pasted or uploaded CSV blobs
//!
//! Spreadsheet exports from the front desk come with either `,` or `;` as
//! separator and may carry quoted cells with embedded newlines. Parsing is a
//! single forward scan: detect the delimiter once, reassemble logical records
//! across physical lines while quotes are unbalanced, split each record,
//! then drop blank records and peel off the header row.

/// Parsed CSV: header row plus data rows, blank rows removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub delimiter: char,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Choose `;` or `,` from the first non-blank line.
///
/// Semicolon wins only when it strictly outnumbers commas.
pub fn detect_delimiter(line: &str) -> char {
    let semicolons = line.matches(';').count();
    let commas = line.matches(',').count();
    if semicolons > commas {
        ';'
    } else {
        ','
    }
}

/// Split one logical line into trimmed fields.
///
/// Inside quotes, `""` decodes to a literal `"`; the delimiter only ends a
/// field outside quotes.
pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Even number of `"` characters, a `""` pair counting as one escape unit
/// that doesn't contribute to the count.
pub fn has_balanced_quotes(text: &str) -> bool {
    let mut count = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }
        if chars.peek() == Some(&'"') {
            chars.next();
        } else {
            count += 1;
        }
    }

    count % 2 == 0
}

/// Reassemble physical lines into logical records and split each one.
///
/// While a record has unbalanced quotes, following lines are appended with
/// the newline restored. Greedy: a record still open at end of input is
/// emitted as it stands.
pub fn read_records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    // Raw text of a record whose quoted field is still open
    let mut pending: Option<String> = None;

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let raw = match pending.take() {
            Some(mut buf) => {
                buf.push('\n');
                buf.push_str(line);
                buf
            }
            None => line.to_string(),
        };

        if has_balanced_quotes(&raw) {
            records.push(split_line(&raw, delimiter));
        } else {
            pending = Some(raw);
        }
    }

    if let Some(raw) = pending {
        tracing::debug!("unterminated quoted field at end of input");
        records.push(split_line(&raw, delimiter));
    }

    records
}

/// Parse a CSV blob into header and data rows.
///
/// A leading UTF-8 byte order mark (written by spreadsheet "CSV UTF-8"
/// exports) is dropped before the header is read.
pub fn parse(text: &str) -> ParsedCsv {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut records = read_records(text, delimiter)
        .into_iter()
        .filter(|fields| fields.iter().any(|f| !f.is_empty()));

    let headers = records.next().unwrap_or_default();
    let rows = records.collect();

    ParsedCsv {
        delimiter,
        headers,
        rows,
    }
}
