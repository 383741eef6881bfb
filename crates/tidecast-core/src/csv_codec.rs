//! Quote-aware CSV codec for exogenous templates, imports and exports.
//!
//! Parsing is a single pass over the characters with one `in_quotes` flag.
//! `\r\n`, `\n` and a bare `\r` all terminate a row. The first row is the
//! header row; rows are not required to match its width.

use serde::{Deserialize, Serialize};

use crate::error::CsvParseError;

pub const DEFAULT_DELIMITER: char = ',';

/// Parsed CSV text: a header row plus raw data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvDocument {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvDocument {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Number of data rows whose width differs from the header row.
    pub fn ragged_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.len() != self.headers.len())
            .count()
    }

    /// Cells of the named column, with `""` for rows that are too short.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|header| header.trim() == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Rows keyed by header. Short rows are padded with `""`, extra cells ignored.
    pub fn records(&self) -> Vec<CsvRecord> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(index, header)| {
                        (
                            header.clone(),
                            row.get(index).cloned().unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .collect()
    }
}

/// String-keyed record that remembers the order keys were first set in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRecord {
    fields: Vec<(String, String)>,
}

impl CsvRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CsvRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.set(key, value);
        }
        record
    }
}

struct Scan {
    rows: Vec<Vec<String>>,
    unterminated_quote_line: Option<usize>,
}

fn scan(text: &str, delimiter: char) -> Scan {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1_usize;
    let mut quote_line = 1_usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                if ch == '\n' || (ch == '\r' && chars.peek() != Some(&'\n')) {
                    line += 1;
                }
                field.push(ch);
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            '\r' | '\n' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                line += 1;
            }
            c if c == delimiter => row.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }

    // End of input closes an open quote.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    while rows
        .last()
        .is_some_and(|last| last.iter().all(String::is_empty))
    {
        rows.pop();
    }

    Scan {
        rows,
        unterminated_quote_line: in_quotes.then_some(quote_line),
    }
}

fn into_document(mut rows: Vec<Vec<String>>) -> CsvDocument {
    if rows.len() < 2 {
        return CsvDocument::default();
    }
    let headers = rows.remove(0);
    CsvDocument { headers, rows }
}

/// Parses CSV text, recovering from an unterminated quote by closing it at
/// end of input.
pub fn parse(text: &str, delimiter: char) -> CsvDocument {
    into_document(scan(text, delimiter).rows)
}

/// Like [`parse`] but rejects an unterminated quoted field.
pub fn parse_strict(text: &str, delimiter: char) -> Result<CsvDocument, CsvParseError> {
    let scanned = scan(text, delimiter);
    if let Some(line) = scanned.unterminated_quote_line {
        return Err(CsvParseError::UnterminatedQuote { line });
    }
    Ok(into_document(scanned.rows))
}

/// Serializes records using the union of their keys, in first-seen order,
/// as the header row.
pub fn serialize(records: &[CsvRecord], delimiter: char) -> String {
    let mut headers: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !headers.contains(&key) {
                headers.push(key);
            }
        }
    }

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(join_cells(headers.iter().copied(), delimiter));
    for record in records {
        lines.push(join_cells(
            headers.iter().map(|header| record.get(header).unwrap_or("")),
            delimiter,
        ));
    }
    lines.join("\n")
}

/// Writes a document with its own header row. Every data row is padded or
/// truncated to the header width, so the output is always rectangular.
pub fn write_document(document: &CsvDocument, delimiter: char) -> String {
    if document.headers.is_empty() {
        return String::new();
    }

    let width = document.headers.len();
    let mut lines = Vec::with_capacity(document.rows.len() + 1);
    lines.push(join_cells(
        document.headers.iter().map(String::as_str),
        delimiter,
    ));
    for row in &document.rows {
        lines.push(join_cells(
            (0..width).map(|index| row.get(index).map(String::as_str).unwrap_or("")),
            delimiter,
        ));
    }
    lines.join("\n")
}

/// Guesses the delimiter of pasted text from its first line.
pub fn detect_delimiter(text: &str) -> char {
    let first_line = text
        .trim_start_matches('\u{feff}')
        .split(['\n', '\r'])
        .next()
        .unwrap_or("");

    if first_line.contains(',') {
        DEFAULT_DELIMITER
    } else if first_line.contains('\t') {
        '\t'
    } else if first_line.contains(';') {
        ';'
    } else {
        DEFAULT_DELIMITER
    }
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, delimiter: char) -> String {
    let mut line = String::new();
    for (index, cell) in cells.enumerate() {
        if index > 0 {
            line.push(delimiter);
        }
        line.push_str(&escape_cell(cell, delimiter));
    }
    line
}

fn escape_cell(cell: &str, delimiter: char) -> String {
    let needs_quotes = cell
        .chars()
        .any(|ch| ch == delimiter || ch == '"' || ch == '\n' || ch == '\r');
    if needs_quotes {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn parses_quoted_delimiters() {
        let document = parse("a,b\n1,\"x,y\"\n2,z", ',');

        assert_eq!(document.headers, strings(&["a", "b"]));
        assert_eq!(
            document.rows,
            vec![strings(&["1", "x,y"]), strings(&["2", "z"])]
        );
    }

    #[test]
    fn all_line_endings_are_equivalent() {
        let unix = parse("a,b\n1,2\n3,4", ',');
        let windows = parse("a,b\r\n1,2\r\n3,4\r\n", ',');
        let classic_mac = parse("a,b\r1,2\r3,4\r", ',');

        assert_eq!(unix, windows);
        assert_eq!(unix, classic_mac);
    }

    #[test]
    fn doubled_quotes_and_embedded_newlines_are_literal() {
        let document = parse("note\n\"say \"\"hi\"\"\nthere\"", ',');
        assert_eq!(document.rows, vec![strings(&["say \"hi\"\nthere"])]);
    }

    #[test]
    fn trailing_empty_rows_are_dropped() {
        let document = parse("a,b\n1,2\n,\n\n\n", ',');
        assert_eq!(document.rows, vec![strings(&["1", "2"])]);
    }

    #[test]
    fn interior_empty_rows_are_kept() {
        let document = parse("a\n1\n\n2", ',');
        assert_eq!(
            document.rows,
            vec![strings(&["1"]), strings(&[""]), strings(&["2"])]
        );
    }

    #[test]
    fn empty_and_header_only_inputs_are_empty_documents() {
        assert_eq!(parse("", ','), CsvDocument::default());
        assert_eq!(parse("a,b\n", ','), CsvDocument::default());
        assert_eq!(parse("\n\n", ','), CsvDocument::default());
    }

    #[test]
    fn ragged_rows_are_preserved_on_parse() {
        let document = parse("a,b,c\n1\n1,2,3,4", ',');
        assert_eq!(document.rows[0].len(), 1);
        assert_eq!(document.rows[1].len(), 4);
        assert_eq!(document.ragged_rows(), 2);
    }

    #[test]
    fn unterminated_quote_is_closed_permissively() {
        let document = parse("a,b\n1,\"open\n2,3", ',');
        assert_eq!(document.rows, vec![strings(&["1", "open\n2,3"])]);
    }

    #[test]
    fn strict_parse_names_the_line_of_the_open_quote() {
        let err = parse_strict("a,b\n1,2\n3,\"open\nmore", ',').expect_err("must fail");
        assert_eq!(err, CsvParseError::UnterminatedQuote { line: 3 });

        let ok = parse_strict("a,b\n1,\"x\ny\"", ',').expect("balanced quotes");
        assert_eq!(ok.rows, vec![strings(&["1", "x\ny"])]);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let document = parse("\u{feff}ADR,RoomNights\n1,2", ',');
        assert_eq!(document.headers, strings(&["ADR", "RoomNights"]));
    }

    #[test]
    fn alternative_delimiters() {
        let document = parse("a\tb\n1\t\"2\t3\"", '\t');
        assert_eq!(document.rows, vec![strings(&["1", "2\t3"])]);
    }

    #[test]
    fn serialize_uses_first_seen_header_order() {
        let records = vec![
            CsvRecord::new().with("zeta", "1").with("alpha", "2"),
            CsvRecord::new().with("mid", "3").with("zeta", "4"),
        ];

        let text = serialize(&records, ',');
        assert_eq!(text, "zeta,alpha,mid\n1,2,\n4,,3");
    }

    #[test]
    fn serialize_quotes_special_cells() {
        let records = vec![CsvRecord::new()
            .with("plain", "x")
            .with("comma", "a,b")
            .with("quote", "say \"hi\"")
            .with("newline", "l1\nl2")];

        let text = serialize(&records, ',');
        assert_eq!(
            text,
            "plain,comma,quote,newline\nx,\"a,b\",\"say \"\"hi\"\"\",\"l1\nl2\""
        );
    }

    #[test]
    fn round_trip_reproduces_values() {
        let records = vec![
            CsvRecord::new()
                .with("name", "a, \"b\"\r\nc")
                .with("value", "1.5"),
            CsvRecord::new().with("name", "plain").with("value", "-2"),
        ];

        let document = parse(&serialize(&records, ','), ',');
        assert_eq!(document.headers, strings(&["name", "value"]));
        assert_eq!(document.records(), records);
    }

    #[test]
    fn write_document_is_rectangular() {
        let document = CsvDocument::new(
            strings(&["a", "b"]),
            vec![strings(&["1"]), strings(&["1", "2", "3"])],
        );

        assert_eq!(write_document(&document, ','), "a,b\n1,\n1,2");
        assert_eq!(
            write_document(&CsvDocument::new(strings(&["a", "b"]), Vec::new()), ','),
            "a,b"
        );
    }

    #[test]
    fn records_pad_short_rows() {
        let document = parse("a,b\n1", ',');
        let records = document.records();
        assert_eq!(records[0].get("a"), Some("1"));
        assert_eq!(records[0].get("b"), Some(""));
    }

    #[test]
    fn detects_spreadsheet_paste_delimiters() {
        assert_eq!(detect_delimiter("a,b\n1,2"), ',');
        assert_eq!(detect_delimiter("a\tb\n1\t2"), '\t');
        assert_eq!(detect_delimiter("a;b\n1;2"), ';');
        assert_eq!(detect_delimiter("single"), ',');
    }
}
