// Per-chain source normalizers.
//
// Each vendor export is converted into the canonical six-field SalesRecord
// shape. Layouts are fixed: headers are validated by name and order and any
// mismatch aborts the load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::Data;
use chrono::NaiveDate;
use log::{debug, info};
use sellout_recon::config::{ChainConfig, SourceLayout};
use sellout_recon::{ReconError, SalesBatch, SalesRecord};

use crate::xlsx::{self, SheetTable};

/// Header row of every sheet already in per-transaction shape.
pub const SALES_HEADERS: [&str; 6] = [
    "PUNTO DE VENTA",
    "EAN",
    "MODELO",
    "UNIDADES",
    "VALOR TOTAL",
    "FECHA",
];

/// Identifying columns at the left of both melt-layout sheets; every column
/// after them is a store.
pub const MELT_ID_HEADERS: [&str; 3] = ["EAN", "MODELO", "FECHA"];

/// Load one chain's export according to its layout.
pub fn load_chain(chain: &ChainConfig, path: &Path) -> Result<SalesBatch, ReconError> {
    let batch = match chain.layout {
        SourceLayout::Passthrough => load_passthrough(&chain.name, path)?,
        SourceLayout::Melt => load_melt(&chain.name, path)?,
        SourceLayout::Directory => load_directory(&chain.name, path)?,
        SourceLayout::MultiSheet => load_multi_sheet(&chain.name, path)?,
    };
    info!(
        "{} ({}): {} sales rows from {}",
        chain.name,
        chain.layout,
        batch.len(),
        path.display()
    );
    Ok(batch)
}

// ---------------------------------------------------------------------------
// Canonical layouts
// ---------------------------------------------------------------------------

/// First sheet of a workbook that is already one row per transaction.
pub fn load_passthrough(chain: &str, path: &Path) -> Result<SalesBatch, ReconError> {
    let table = xlsx::read_sheet_at(path, 0)?;
    parse_canonical(chain, &source_name(path, &table), &table)
}

/// Every file in `folder` (file-name order), concatenated and re-indexed.
pub fn load_directory(chain: &str, folder: &Path) -> Result<SalesBatch, ReconError> {
    let entries = std::fs::read_dir(folder).map_err(|e| ReconError::source_read(folder, e))?;
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReconError::source_read(folder, e))?;
        let file_type = entry.file_type().map_err(|e| ReconError::source_read(entry.path(), e))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut batch = SalesBatch::new(chain);
    for file in &files {
        debug!("{chain}: reading {}", file.display());
        let table = xlsx::read_sheet_at(file, 0)?;
        batch.extend(parse_canonical(chain, &source_name(file, &table), &table)?);
    }
    batch.reindex();
    Ok(batch)
}

/// Every sheet of one workbook, in sheet order; per-sheet indices are kept.
pub fn load_multi_sheet(chain: &str, path: &Path) -> Result<SalesBatch, ReconError> {
    let mut batch = SalesBatch::new(chain);
    for table in xlsx::read_all_sheets(path)? {
        batch.extend(parse_canonical(chain, &source_name(path, &table), &table)?);
    }
    Ok(batch)
}

/// Validate the canonical header and convert every row, indexed `0..n`.
pub fn parse_canonical(
    chain: &str,
    source: &str,
    table: &SheetTable,
) -> Result<SalesBatch, ReconError> {
    check_header(source, &table.header, &SALES_HEADERS)?;

    let mut batch = SalesBatch::new(chain);
    for (index, (line, cells)) in table.rows.iter().enumerate() {
        let cell = |col: usize| SheetTable::cell(cells, col);
        let record = SalesRecord {
            store: xlsx::cell_text(cell(0)),
            product_code: xlsx::cell_text(cell(1)),
            model: xlsx::cell_text(cell(2)),
            units: number(source, *line, SALES_HEADERS[3], cell(3))?.unwrap_or(0.0),
            amount: number(source, *line, SALES_HEADERS[4], cell(4))?.unwrap_or(0.0),
            date: date(source, *line, cell(5))?,
        };
        batch.push(index, record);
    }
    Ok(batch)
}

// ---------------------------------------------------------------------------
// Melt layout
// ---------------------------------------------------------------------------

/// One nonzero value after un-pivoting a store column.
#[derive(Debug, Clone)]
struct MeltedCell {
    product_code: String,
    model: String,
    date: NaiveDate,
    store: String,
    value: f64,
}

type MeltKey<'a> = (&'a str, &'a str, NaiveDate, &'a str);

impl MeltedCell {
    fn key(&self) -> MeltKey<'_> {
        (&self.product_code, &self.model, self.date, &self.store)
    }
}

/// Amount sheet (first) and units sheet (second), each with one column per
/// store. Both are un-pivoted, zero values dropped, then inner-joined on
/// (EAN, MODELO, FECHA, store) so a row exists only where both measures do.
pub fn load_melt(chain: &str, path: &Path) -> Result<SalesBatch, ReconError> {
    let amounts = xlsx::read_sheet_at(path, 0)?;
    let units = xlsx::read_sheet_at(path, 1)?;

    let amount_cells = melt(&source_name(path, &amounts), &amounts, "VALOR TOTAL")?;
    let unit_cells = melt(&source_name(path, &units), &units, "UNIDADES")?;
    debug!(
        "{chain}: {} nonzero amounts, {} nonzero unit counts",
        amount_cells.len(),
        unit_cells.len()
    );

    Ok(SalesBatch::from_records(chain, merge_melted(&amount_cells, &unit_cells)))
}

/// Un-pivot store columns, store by store, dropping zero and blank values.
fn melt(source: &str, table: &SheetTable, measure: &str) -> Result<Vec<MeltedCell>, ReconError> {
    let fixed = MELT_ID_HEADERS.len();
    if table.header.len() <= fixed {
        return Err(schema_mismatch(source, &MELT_ID_HEADERS, &table.header));
    }
    check_header(source, &table.header[..fixed], &MELT_ID_HEADERS)?;
    if table.header[fixed..].iter().any(|h| h.is_empty()) {
        return Err(ReconError::SchemaMismatch {
            source_name: source.to_string(),
            expected: vec!["store name in every column after FECHA".into()],
            found: table.header.clone(),
        });
    }

    // FECHA is parsed on a row's first nonzero value, so rows with no
    // sales (totals, separators) never need a valid date.
    let mut days: Vec<Option<NaiveDate>> = vec![None; table.rows.len()];

    let mut out = Vec::new();
    for (col, store) in table.header.iter().enumerate().skip(fixed) {
        for ((line, cells), slot) in table.rows.iter().zip(days.iter_mut()) {
            let value = match number(source, *line, measure, SheetTable::cell(cells, col))? {
                Some(v) if v != 0.0 => v,
                _ => continue,
            };
            let day = match *slot {
                Some(d) => d,
                None => {
                    let d = date(source, *line, SheetTable::cell(cells, 2))?;
                    *slot = Some(d);
                    d
                }
            };
            out.push(MeltedCell {
                product_code: xlsx::cell_text(SheetTable::cell(cells, 0)),
                model: xlsx::cell_text(SheetTable::cell(cells, 1)),
                date: day,
                store: store.clone(),
                value,
            });
        }
    }
    Ok(out)
}

/// Inner join in amount order; duplicate keys pair up as a cross product.
fn merge_melted(amounts: &[MeltedCell], units: &[MeltedCell]) -> Vec<SalesRecord> {
    let mut by_key: HashMap<MeltKey<'_>, Vec<f64>> = HashMap::new();
    for cell in units {
        by_key.entry(cell.key()).or_default().push(cell.value);
    }

    let mut records = Vec::new();
    for amount in amounts {
        let Some(matches) = by_key.get(&amount.key()) else {
            continue;
        };
        for &units in matches {
            records.push(SalesRecord {
                store: amount.store.clone(),
                product_code: amount.product_code.clone(),
                model: amount.model.clone(),
                units,
                amount: amount.value,
                date: amount.date,
            });
        }
    }
    records
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn source_name(path: &Path, table: &SheetTable) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!("{file} [{}]", table.name)
}

fn check_header(source: &str, found: &[String], expected: &[&str]) -> Result<(), ReconError> {
    if found.len() == expected.len() && found.iter().zip(expected).all(|(f, e)| f == e) {
        Ok(())
    } else {
        Err(schema_mismatch(source, expected, found))
    }
}

fn schema_mismatch(source: &str, expected: &[&str], found: &[String]) -> ReconError {
    ReconError::SchemaMismatch {
        source_name: source.to_string(),
        expected: expected.iter().map(|s| s.to_string()).collect(),
        found: found.to_vec(),
    }
}

fn number(source: &str, row: usize, column: &str, cell: &Data) -> Result<Option<f64>, ReconError> {
    xlsx::cell_number(cell).map_err(|value| ReconError::NumberParse {
        source_name: source.to_string(),
        row,
        column: column.to_string(),
        value,
    })
}

fn date(source: &str, row: usize, cell: &Data) -> Result<NaiveDate, ReconError> {
    xlsx::cell_date(cell).map_err(|value| ReconError::DateParse {
        source_name: source.to_string(),
        row,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(header: &[&str], rows: Vec<Vec<Data>>) -> SheetTable {
        SheetTable {
            name: "Hoja1".into(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: rows.into_iter().enumerate().map(|(i, r)| (i + 2, r)).collect(),
        }
    }

    fn s(v: &str) -> Data {
        Data::String(v.into())
    }

    fn n(v: f64) -> Data {
        Data::Float(v)
    }

    #[test]
    fn canonical_rows_pass_through_unchanged() {
        let t = table(
            &SALES_HEADERS,
            vec![
                vec![s("S1"), n(8806098363391.0), s("OLED55"), n(5.0), n(100.0), s("2023-01-15")],
                vec![s("S1"), n(8806098363391.0), s("OLED55"), n(0.0), n(0.0), s("2023-01-16")],
            ],
        );
        let batch = parse_canonical("ALKOSTO", "test", &t).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.index, vec![0, 1]);
        let r = &batch.records[0];
        assert_eq!(r.product_code, "8806098363391");
        assert_eq!(r.units, 5.0);
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2023, 1, 15).unwrap());
        assert_eq!(batch.records[1].units, 0.0);
    }

    #[test]
    fn canonical_header_mismatch_fails() {
        let t = table(
            &["PUNTO DE VENTA", "EAN", "UNIDADES", "MODELO", "VALOR TOTAL", "FECHA"],
            vec![],
        );
        let err = parse_canonical("X", "ventas.xlsx [Hoja1]", &t).unwrap_err();
        assert!(matches!(err, ReconError::SchemaMismatch { .. }));
        assert!(err.to_string().starts_with("ventas.xlsx [Hoja1]: expected columns"));
    }

    #[test]
    fn canonical_bad_date_reports_row() {
        let t = table(
            &SALES_HEADERS,
            vec![vec![s("S1"), s("E1"), s("M"), n(1.0), n(1.0), s("pronto")]],
        );
        let err = parse_canonical("X", "src", &t).unwrap_err();
        assert_eq!(err.to_string(), "src, row 2: cannot parse date 'pronto'");
    }

    #[test]
    fn canonical_bad_number_reports_column() {
        let t = table(
            &SALES_HEADERS,
            vec![vec![s("S1"), s("E1"), s("M"), s("five"), n(1.0), s("2023-01-15")]],
        );
        let err = parse_canonical("X", "src", &t).unwrap_err();
        assert!(matches!(
            err,
            ReconError::NumberParse { ref column, ref value, .. }
                if column == "UNIDADES" && value == "five"
        ));
    }

    fn melt_header() -> Vec<&'static str> {
        vec!["EAN", "MODELO", "FECHA", "ACQUA", "WTC CALI"]
    }

    #[test]
    fn melt_is_store_major_and_drops_zeros() {
        let t = table(
            &melt_header(),
            vec![
                vec![s("E1"), s("M1"), n(44197.0), n(10.0), n(0.0)],
                vec![s("E2"), s("M2"), n(44198.0), Data::Empty, n(30.0)],
            ],
        );
        let cells = melt("src", &t, "VALOR TOTAL").unwrap();
        let got: Vec<_> = cells
            .iter()
            .map(|c| (c.store.as_str(), c.product_code.as_str(), c.value))
            .collect();
        assert_eq!(got, [("ACQUA", "E1", 10.0), ("WTC CALI", "E2", 30.0)]);
        assert_eq!(cells[0].date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    }

    #[test]
    fn melt_skips_zero_rows_without_date() {
        let t = table(
            &["EAN", "MODELO", "FECHA", "ACQUA"],
            vec![
                vec![s("E1"), s("M1"), n(44941.0), n(10.0)],
                vec![s("TOTAL"), s(""), Data::Empty, n(0.0)],
            ],
        );
        let cells = melt("src", &t, "UNIDADES").unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].product_code, "E1");
        assert_eq!(cells[0].date, NaiveDate::from_ymd_opt(2023, 1, 15).unwrap());
    }

    #[test]
    fn melt_still_rejects_bad_date_on_sales_row() {
        let t = table(
            &["EAN", "MODELO", "FECHA", "ACQUA"],
            vec![vec![s("E1"), s("M1"), s("pronto"), n(3.0)]],
        );
        let err = melt("src", &t, "UNIDADES").unwrap_err();
        assert_eq!(err.to_string(), "src, row 2: cannot parse date 'pronto'");
    }

    #[test]
    fn melt_requires_identifying_columns() {
        let t = table(&["MODELO", "EAN", "FECHA", "ACQUA"], vec![]);
        assert!(matches!(
            melt("src", &t, "UNIDADES").unwrap_err(),
            ReconError::SchemaMismatch { .. }
        ));

        let t = table(&["EAN", "MODELO", "FECHA"], vec![]);
        assert!(melt("src", &t, "UNIDADES").is_err());
    }

    #[test]
    fn merge_keeps_only_pairs_with_both_measures() {
        let amounts = table(
            &melt_header(),
            vec![
                vec![s("E1"), s("M1"), n(44197.0), n(1000.0), n(500.0)],
                vec![s("E2"), s("M2"), n(44197.0), n(-4300.0), n(0.0)],
            ],
        );
        let units = table(
            &melt_header(),
            vec![
                vec![s("E1"), s("M1"), n(44197.0), n(2.0), n(0.0)],
                vec![s("E2"), s("M2"), n(44197.0), n(-1.0), n(3.0)],
            ],
        );
        let a = melt("a", &amounts, "VALOR TOTAL").unwrap();
        let u = melt("u", &units, "UNIDADES").unwrap();
        let records = merge_melted(&a, &u);

        let got: Vec<_> = records
            .iter()
            .map(|r| (r.store.as_str(), r.product_code.as_str(), r.units, r.amount))
            .collect();
        assert_eq!(got, [("ACQUA", "E1", 2.0, 1000.0), ("ACQUA", "E2", -1.0, -4300.0)]);
        assert!(records.iter().all(|r| r.units != 0.0 && r.amount != 0.0));
    }

    type MeltRow = (u8, u8, Vec<Option<i8>>);

    const MELT_STORES: [&str; 3] = ["S0", "S1", "S2"];

    fn melt_rows() -> impl Strategy<Value = Vec<MeltRow>> {
        prop::collection::vec(
            (0u8..2, 0u8..2, prop::collection::vec(prop::option::of(-3i8..4), 3)),
            0..8,
        )
    }

    fn melt_table(rows: &[MeltRow]) -> SheetTable {
        let mut header = MELT_ID_HEADERS.to_vec();
        header.extend(MELT_STORES);
        let rows = rows
            .iter()
            .map(|(code, day, values)| {
                let mut cells = vec![s(&format!("E{code}")), s("M"), n(44197.0 + *day as f64)];
                cells.extend(values.iter().map(|v| match v {
                    Some(v) => n(*v as f64),
                    None => Data::Empty,
                }));
                cells
            })
            .collect();
        table(&header, rows)
    }

    fn sold(v: Option<i8>) -> bool {
        matches!(v, Some(v) if v != 0)
    }

    proptest! {
        #[test]
        fn melted_pairs_are_nonzero_and_fully_matched(
            amount_rows in melt_rows(),
            unit_rows in melt_rows(),
        ) {
            let a = melt("a", &melt_table(&amount_rows), "VALOR TOTAL").unwrap();
            let u = melt("u", &melt_table(&unit_rows), "UNIDADES").unwrap();
            let records = merge_melted(&a, &u);

            for r in &records {
                prop_assert!(r.units != 0.0);
                prop_assert!(r.amount != 0.0);
            }

            let mut expected = 0;
            for (code, day, values) in &amount_rows {
                for (col, amount) in values.iter().enumerate() {
                    if !sold(*amount) {
                        continue;
                    }
                    expected += unit_rows
                        .iter()
                        .filter(|(c, d, v)| c == code && d == day && sold(v[col]))
                        .count();
                }
            }
            prop_assert_eq!(records.len(), expected);
        }
    }
}
