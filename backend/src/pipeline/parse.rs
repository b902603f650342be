//! Turns uploaded bytes into a normalized table.
//!
//! Problems inside the data (ragged rows, bad encoding, an empty workbook) are
//! collected in [`ParseResult::errors`]; parsing itself never fails. Choosing
//! the format from a file name is the caller's job, see
//! [`TabularFormat::from_file_name`].

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use common::model::format::TabularFormat;
use common::model::row::Row;
use std::io::Cursor;

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

const EMPTY_FILE: &str = "Empty file";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    pub rows: Vec<Row>,
    /// Column headers in source order; duplicates are kept.
    pub headers: Vec<String>,
    pub errors: Vec<String>,
}

impl ParseResult {
    fn failed(message: impl Into<String>) -> Self {
        ParseResult {
            errors: vec![message.into()],
            ..ParseResult::default()
        }
    }
}

pub fn parse(bytes: &[u8], format: TabularFormat) -> ParseResult {
    match format {
        TabularFormat::Csv => parse_delimited(bytes),
        TabularFormat::Workbook => parse_workbook(bytes),
    }
}

/// Records sampled per candidate when sniffing the delimiter.
const SNIFF_RECORDS: usize = 10;

/// Picks the delimiter that splits the header into several fields and keeps
/// the most sampled records at the header's width. Quoting is honoured, so a
/// delimiter inside a quoted header does not count. Ties, and input no
/// candidate splits, resolve to `,`.
pub(crate) fn detect_delimiter(sample: &[u8]) -> u8 {
    let mut best = (b',', 0usize, 0usize);
    for candidate in DELIMITERS {
        let delimiter = candidate as u8;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(sample);
        let widths: Vec<usize> = reader
            .records()
            .take(SNIFF_RECORDS)
            .filter_map(Result::ok)
            .map(|record| record.len())
            .collect();
        let Some(&header_width) = widths.first() else {
            continue;
        };
        if header_width < 2 {
            continue;
        }
        let consistent = widths.iter().filter(|&&w| w == header_width).count();
        if (consistent, header_width) > (best.1, best.2) {
            best = (delimiter, consistent, header_width);
        }
    }
    best.0
}

/// Byte offset of the first line holding anything but whitespace.
fn first_content_line(bytes: &[u8]) -> usize {
    let mut start = 0;
    for line in bytes.split_inclusive(|&b| b == b'\n') {
        if line.iter().any(|b| !b.is_ascii_whitespace()) {
            break;
        }
        start += line.len();
    }
    start
}

fn is_blank_record(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty()) && record.len() <= 1
}

fn parse_delimited(bytes: &[u8]) -> ParseResult {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let bytes = &bytes[first_content_line(bytes)..];
    if bytes.is_empty() {
        return ParseResult::failed(EMPTY_FILE);
    }

    let delimiter = detect_delimiter(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(|h| h.trim().to_string()).collect(),
        Err(e) => return ParseResult::failed(e.to_string()),
    };

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                errors.push(format!("Row {}: {}", idx + 1, e));
                continue;
            }
        };
        if is_blank_record(&record) {
            continue;
        }
        if record.len() != headers.len() {
            errors.push(format!(
                "Row {}: expected {} fields, found {}",
                idx + 1,
                headers.len(),
                record.len()
            ));
        }
        let mut row = Row::with_capacity(headers.len());
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), value.to_string());
        }
        rows.push(row);
    }

    ParseResult {
        rows,
        headers,
        errors,
    }
}

fn parse_workbook(bytes: &[u8]) -> ParseResult {
    let mut workbook = match open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())) {
        Ok(workbook) => workbook,
        Err(e) => return ParseResult::failed(e.to_string()),
    };
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return ParseResult::failed(EMPTY_FILE);
    };
    match workbook.worksheet_range(&sheet) {
        Ok(range) => table_from_cells(range.rows()),
        Err(e) => ParseResult::failed(e.to_string()),
    }
}

/// Workbook cells as text. Whole numbers drop the fractional part so phone
/// numbers stored as numbers come out as digits.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Builds the table from a sheet's rows: first row is the header row, blank
/// headers are dropped, fully empty data rows are discarded.
fn table_from_cells<'a, I>(mut cells: I) -> ParseResult
where
    I: Iterator<Item = &'a [Data]>,
{
    let Some(header_cells) = cells.next() else {
        return ParseResult::failed(EMPTY_FILE);
    };

    // each kept header remembers its own column, so a dropped blank header
    // does not shift the columns after it
    let columns: Vec<(usize, String)> = header_cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| (idx, cell_text(cell).trim().to_string()))
        .filter(|(_, header)| !header.is_empty())
        .collect();

    let mut rows = Vec::new();
    for row_cells in cells {
        if row_cells.iter().all(|cell| cell_text(cell).is_empty()) {
            continue;
        }
        let mut row = Row::with_capacity(columns.len());
        for (idx, header) in &columns {
            let value = row_cells.get(*idx).map(cell_text).unwrap_or_default();
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    ParseResult {
        rows,
        headers: columns.into_iter().map(|(_, header)| header).collect(),
        errors: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(text: &str) -> ParseResult {
        parse(text.as_bytes(), TabularFormat::Csv)
    }

    #[test]
    fn rows_are_keyed_by_trimmed_headers_in_order() {
        let result = csv(" Name , Phone ,Email\nAda,555,ada@example.com\nGrace,556,\nLinus,557,l@example.com\n");
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.headers, vec!["Name", "Phone", "Email"]);
        assert_eq!(result.rows.len(), 3);
        let keys: Vec<&String> = result.rows[0].keys().collect();
        assert_eq!(keys, vec!["Name", "Phone", "Email"]);
        assert_eq!(result.rows[1]["Name"], "Grace");
        assert_eq!(result.rows[1]["Email"], "");
        assert_eq!(result.rows[2]["Phone"], "557");
    }

    #[test]
    fn empty_lines_and_bom_are_skipped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"\n\r\nName,Phone\r\nAda,1\r\n\r\nGrace,2\r\n\n");
        let result = parse(&bytes, TabularFormat::Csv);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.headers, vec!["Name", "Phone"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[1]["Phone"], "2");
    }

    #[test]
    fn quoted_fields_keep_embedded_delimiters() {
        let result = csv("Name,Company\n\"Lovelace, Ada\",\"Engines \"\"Ltd\"\"\"\n");
        assert!(result.errors.is_empty());
        assert_eq!(result.rows[0]["Name"], "Lovelace, Ada");
        assert_eq!(result.rows[0]["Company"], "Engines \"Ltd\"");
    }

    #[test]
    fn ragged_rows_are_kept_and_reported() {
        let result = csv("Name,Phone,Email\nAda,555\nGrace,556,g@example.com,extra\n");
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("expected 3 fields, found 2"));
        assert!(!result.rows[0].contains_key("Email"));
        assert_eq!(result.rows[1].len(), 3);
    }

    #[test]
    fn semicolon_delimited_files_are_detected() {
        let result = csv("Name;Phone\nAda;555\n");
        assert_eq!(result.headers, vec!["Name", "Phone"]);
        assert_eq!(result.rows[0]["Phone"], "555");
    }

    #[test]
    fn delimiter_ties_prefer_comma() {
        assert_eq!(detect_delimiter(b"Name"), b',');
        assert_eq!(detect_delimiter(b"a,b;c"), b',');
        assert_eq!(detect_delimiter(b"a\tb\tc"), b'\t');
    }

    #[test]
    fn delimiters_inside_quoted_headers_are_ignored() {
        let result = csv("Name,\"Notes; misc; more\"\nAda,hi\nGrace,yo\n");
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.headers, vec!["Name", "Notes; misc; more"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[1]["Notes; misc; more"], "yo");
    }

    #[test]
    fn consistent_row_widths_decide_between_candidates() {
        // more commas than semicolons in the header, but only `;` fits the rows
        assert_eq!(detect_delimiter(b"Name;Tags,x,y\nAda;a\nGrace;c\n"), b';');
    }

    #[test]
    fn duplicate_headers_are_listed_and_last_value_wins() {
        let result = csv("Name,Phone,Phone\nAda,111,222\n");
        assert_eq!(result.headers, vec!["Name", "Phone", "Phone"]);
        assert_eq!(result.rows[0].len(), 2);
        assert_eq!(result.rows[0]["Phone"], "222");
    }

    #[test]
    fn empty_input_reports_a_single_diagnostic() {
        let result = csv("\n\n");
        assert!(result.rows.is_empty());
        assert_eq!(result.errors, vec![EMPTY_FILE.to_string()]);
    }

    #[test]
    fn unreadable_workbook_is_a_diagnostic_not_a_failure() {
        let result = parse(b"definitely not a spreadsheet", TabularFormat::Workbook);
        assert!(result.rows.is_empty());
        assert!(result.headers.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn workbook_grid_drops_blank_headers_and_empty_rows() {
        let grid: Vec<Vec<Data>> = vec![
            vec![
                Data::String(" Name ".into()),
                Data::Empty,
                Data::String("Phone".into()),
            ],
            vec![
                Data::String("Ada".into()),
                Data::String("ignored".into()),
                Data::Float(5551234.0),
            ],
            vec![Data::Empty, Data::String(String::new()), Data::Empty],
            vec![Data::String("Grace".into())],
        ];
        let result = table_from_cells(grid.iter().map(|r| r.as_slice()));
        assert!(result.errors.is_empty());
        assert_eq!(result.headers, vec!["Name", "Phone"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0]["Phone"], "5551234");
        assert_eq!(result.rows[1]["Name"], "Grace");
        assert_eq!(result.rows[1]["Phone"], "");
    }

    #[test]
    fn workbook_without_rows_is_an_empty_result() {
        let grid: Vec<Vec<Data>> = Vec::new();
        let result = table_from_cells(grid.iter().map(|r| r.as_slice()));
        assert!(result.rows.is_empty());
        assert_eq!(result.errors, vec![EMPTY_FILE.to_string()]);
    }

    #[test]
    fn cell_text_formats_values() {
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
