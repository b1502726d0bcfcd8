//! Spreadsheet reader: turns uploaded statement bytes into raw rows
//!
//! Banks export statements as xlsx/xls/ods workbooks or as delimited text.
//! Calamine handles the workbook containers; anything it rejects is retried
//! as CSV if the bytes are text. Everything else is `UnreadableFile`.

use std::io::Cursor;

use calamine::{Data, Reader};
use chrono::NaiveDate;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Cell, ColumnRef, NewFormatProfile, RawRow};

/// Read statement bytes into the sequence of data rows for `profile`.
///
/// The header/data boundary is the first row whose mapped date column parses
/// as a date; everything above it (titles, column headers, blank padding) is
/// skipped. Rows where every mapped cell is empty are dropped silently, since
/// statements commonly pad with decorative blank lines.
pub fn read_rows(bytes: &[u8], profile: &NewFormatProfile) -> Result<Vec<RawRow>> {
    let rows = read_all_rows(bytes)?;
    let mapped = mapped_columns(profile);

    // Locate the first data row by probing the date column
    let data_start = rows
        .iter()
        .position(|row| cell_date(row.cell(profile.date_col)).is_some());

    let Some(start) = data_start else {
        debug!("No row with a parseable date in column {}", profile.date_col);
        return Ok(Vec::new());
    };

    let kept: Vec<RawRow> = rows
        .into_iter()
        .skip(start)
        .filter(|row| mapped.iter().any(|col| !row.cell(*col).is_empty()))
        .collect();

    debug!(
        "Read {} data rows (data starts at physical row {})",
        kept.len(),
        start
    );
    Ok(kept)
}

/// Every physical row of the first sheet, in order, with no filtering
fn read_all_rows(bytes: &[u8]) -> Result<Vec<RawRow>> {
    match calamine::open_workbook_auto_from_rs(Cursor::new(bytes)) {
        Ok(mut workbook) => {
            let sheet_name = workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| Error::UnreadableFile("workbook has no sheets".into()))?;
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| Error::UnreadableFile(format!("cannot read sheet: {}", e)))?;

            let rows = range
                .rows()
                .enumerate()
                .map(|(index, row)| RawRow {
                    index,
                    cells: row.iter().map(convert_cell).collect(),
                })
                .collect();
            Ok(rows)
        }
        Err(_) => read_delimited(bytes),
    }
}

/// CSV fallback for text exports
fn read_delimited(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let text = std::str::from_utf8(bytes).map_err(|_| {
        Error::UnreadableFile("not a recognized spreadsheet container".into())
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result
            .map_err(|e| Error::UnreadableFile(format!("malformed delimited text: {}", e)))?;
        rows.push(RawRow {
            index,
            cells: record
                .iter()
                .map(|s| {
                    let s = s.trim();
                    if s.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(s.to_string())
                    }
                })
                .collect(),
        });
    }
    Ok(rows)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.to_string())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Some(date) => Cell::Date(date),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

/// The set of columns the profile actually maps
fn mapped_columns(profile: &NewFormatProfile) -> Vec<ColumnRef> {
    let mut cols = vec![profile.date_col, profile.desc_col];
    for col in [
        profile.debit_col,
        profile.credit_col,
        profile.amount_col,
        profile.indicator_col,
        profile.trans_id_col,
    ]
    .into_iter()
    .flatten()
    {
        cols.push(col);
    }
    cols
}

/// Interpret a cell as a calendar date, if possible
pub fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => parse_date(s),
        Cell::Number(n) => excel_serial_to_date(*n),
        Cell::Empty => None,
    }
}

/// Interpret a cell as a monetary amount, if possible
pub fn cell_amount(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => parse_amount(s),
        _ => None,
    }
}

/// Parse a date string in the formats bank exports actually use.
///
/// ISO first (unambiguous), then day-first before month-first: the statement
/// vocabulary this tracker targets (DR/CR indicators, NEFT narrations) is
/// dd/mm territory.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%d/%m/%Y", // 15/01/2024
        "%d-%m-%Y", // 15-01-2024
        "%d/%m/%y", // 15/01/24
        "%d-%b-%Y", // 15-Jan-2024
        "%d %b %Y", // 15 Jan 2024
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

/// Parse an amount string, handling currency symbols, commas, and
/// parenthesized negatives
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', '₹', ',', ' '], "")
        .replace("INR", "")
        .replace('(', "-")
        .replace(')', "");

    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Convert an Excel serial day number to a date (1900 date system)
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=200_000.0).contains(&serial) {
        return None;
    }
    // Excel day 0 is 1899-12-30 (accounting for the leap-year bug)
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(chrono::Days::new(serial.trunc() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AmountScheme;

    fn csv_profile() -> NewFormatProfile {
        NewFormatProfile {
            bank_name: "Test Bank".into(),
            date_col: ColumnRef(0),
            desc_col: ColumnRef(1),
            scheme: AmountScheme::SeparateDebitCredit,
            debit_col: Some(ColumnRef(2)),
            credit_col: Some(ColumnRef(3)),
            amount_col: None,
            indicator_col: None,
            debit_tokens: vec![],
            credit_tokens: vec![],
            trans_id_col: None,
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15"), Some(expected));
        assert_eq!(parse_date("15/01/2024"), Some(expected));
        assert_eq!(parse_date("15-01-2024"), Some(expected));
        assert_eq!(parse_date("15-Jan-2024"), Some(expected));
        assert_eq!(parse_date("Total"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_date_day_first_wins_when_ambiguous() {
        // 05/01 is 5 January, not 1 May
        assert_eq!(
            parse_date("05/01/2024"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("₹ 500.00"), Some(500.0));
        assert_eq!(parse_amount("(100.00)"), Some(-100.0));
        assert_eq!(parse_amount("-123.45"), Some(-123.45));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        // 45306 = 2024-01-15
        assert_eq!(
            excel_serial_to_date(45306.0),
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(excel_serial_to_date(0.0), None);
    }

    #[test]
    fn test_read_rows_skips_header_and_titles() {
        let csv = "ACME BANK LTD,,,\n\
                   Statement of Account,,,\n\
                   Date,Narration,Withdrawal,Deposit\n\
                   15/01/2024,NEFT CR FROM ABC,,500.00\n\
                   16/01/2024,ATM WDL,200.00,\n";

        let rows = read_rows(csv.as_bytes(), &csv_profile()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 3);
        assert_eq!(rows[0].cell(ColumnRef(1)).as_text(), "NEFT CR FROM ABC");
    }

    #[test]
    fn test_read_rows_drops_fully_empty_mapped_rows() {
        let csv = "Date,Narration,Withdrawal,Deposit\n\
                   15/01/2024,COFFEE,120.00,\n\
                   ,,,\n\
                   16/01/2024,SALARY,,50000.00\n";

        let rows = read_rows(csv.as_bytes(), &csv_profile()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cell(ColumnRef(1)).as_text(), "SALARY");
    }

    #[test]
    fn test_read_rows_no_data_rows_is_empty_not_error() {
        let csv = "Date,Narration,Withdrawal,Deposit\nTotal,,,200.00\n";
        let rows = read_rows(csv.as_bytes(), &csv_profile()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unreadable_bytes() {
        // Not a workbook, not text
        let bytes: Vec<u8> = vec![0x00, 0xff, 0xfe, 0x00, 0x80, 0x99];
        match read_rows(&bytes, &csv_profile()) {
            Err(Error::UnreadableFile(_)) => {}
            other => panic!("expected UnreadableFile, got {:?}", other),
        }
    }
}
