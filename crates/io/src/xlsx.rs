// Spreadsheet import (xlsx, xls, xlsb, ods) into plain header + row tables.
//
// Cell values stay as calamine extracted them; the typed accessors below
// convert them on demand so each normalizer can report row-level errors.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::debug;
use sellout_recon::ReconError;

/// One worksheet: trimmed header cells plus the non-empty data rows.
#[derive(Debug, Clone)]
pub struct SheetTable {
    pub name: String,
    pub header: Vec<String>,
    /// `(spreadsheet row number, cells)`; row numbers are 1-based.
    pub rows: Vec<(usize, Vec<Data>)>,
}

impl SheetTable {
    /// Cell at `col`, `Data::Empty` past the end of a short row.
    pub fn cell<'a>(row: &'a [Data], col: usize) -> &'a Data {
        const EMPTY: &Data = &Data::Empty;
        row.get(col).unwrap_or(EMPTY)
    }
}

/// Read the sheet at position `index` (0-based).
pub fn read_sheet_at(path: &Path, index: usize) -> Result<SheetTable, ReconError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReconError::source_read(path, e))?;
    let name = workbook
        .sheet_names()
        .get(index)
        .cloned()
        .ok_or_else(|| {
            ReconError::source_read(path, format!("workbook has no sheet #{}", index + 1))
        })?;
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| ReconError::source_read(path, format!("sheet '{name}': {e}")))?;
    Ok(to_table(name, &range))
}

/// Read every sheet in workbook order.
pub fn read_all_sheets(path: &Path) -> Result<Vec<SheetTable>, ReconError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReconError::source_read(path, e))?;
    let names = workbook.sheet_names().to_vec();
    if names.is_empty() {
        return Err(ReconError::source_read(path, "workbook contains no sheets"));
    }

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ReconError::source_read(path, format!("sheet '{name}': {e}")))?;
        tables.push(to_table(name, &range));
    }
    Ok(tables)
}

fn to_table(name: String, range: &Range<Data>) -> SheetTable {
    // Range start offset (data may not begin at A1)
    let start_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let mut rows_iter = range.rows().enumerate();

    let mut header: Vec<String> = rows_iter
        .next()
        .map(|(_, cells)| cells.iter().map(|c| cell_text(c).trim().to_string()).collect())
        .unwrap_or_default();
    while header.last().is_some_and(|h| h.is_empty()) {
        header.pop();
    }

    let rows: Vec<(usize, Vec<Data>)> = rows_iter
        .filter(|(_, cells)| cells.iter().any(|c| !is_blank(c)))
        .map(|(i, cells)| (start_row + i + 1, cells.to_vec()))
        .collect();

    debug!("sheet '{}': {} columns, {} data rows", name, header.len(), rows.len());
    SheetTable { name, header, rows }
}

pub fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text rendering of a cell. Integral numbers are written without a
/// fractional part so numeric product codes keep their EAN form.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(n) => format_number(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format_number(dt.as_f64()),
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Numeric value of a cell. Blank cells read as `None`.
pub fn cell_number(cell: &Data) -> Result<Option<f64>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::Float(n) => Ok(Some(*n)),
        Data::Int(n) => Ok(Some(*n as f64)),
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>().map(Some).map_err(|_| s.to_string())
        }
        other => Err(cell_text(other)),
    }
}

/// Calendar date of a cell: spreadsheet date cells, 1900-system serials,
/// or text in `YYYY-MM-DD[ HH:MM:SS]` / `DD/MM/YYYY` form.
pub fn cell_date(cell: &Data) -> Result<NaiveDate, String> {
    let parsed = match cell {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::Float(n) => excel_serial_to_date(*n),
        Data::Int(n) => excel_serial_to_date(*n as f64),
        Data::String(s) | Data::DateTimeIso(s) => parse_date_text(s.trim()),
        _ => None,
    };
    parsed.ok_or_else(|| cell_text(cell))
}

/// Convert a 1900-system serial to a date. Serial 1 is 1899-12-31; counting
/// from 1899-12-30 absorbs the format's phantom 1900-02-29.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::try_days(serial.floor() as i64)?)
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
}
