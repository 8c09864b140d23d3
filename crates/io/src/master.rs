// Master (inventory) data import from a SQLite file.

use std::path::Path;

use log::{debug, info};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use sellout_recon::{MasterRow, ReconError};

use crate::sink::quote_ident;

/// Columns the master table must provide, in the order they are selected.
pub const MASTER_COLUMNS: [&str; 16] = [
    "PUNTO DE VENTA",
    "HOMOLOGA ALMACEN",
    "TIPO",
    "CANAL",
    "CADENA",
    "SUBCADENA",
    "REGIONAL",
    "CIUDAD",
    "CORE STORE",
    "PROMOTER",
    "EAN",
    "REFERENCIA HOMOLOGADA",
    "CATEGORIA",
    "SUBCATEGORIA",
    "LINEA",
    "SUBLINEA",
];

/// Read every row of `table` from the master database. The file is opened
/// read-only; extra columns in the table are ignored.
pub fn load_master(path: &Path, table: &str) -> Result<Vec<MasterRow>, ReconError> {
    if !path.is_file() {
        return Err(ReconError::MasterData(format!(
            "{}: file not found",
            path.display()
        )));
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| ReconError::MasterData(format!("{}: {e}", path.display())))?;

    let columns = table_columns(&conn, table)?;
    if columns.is_empty() {
        return Err(ReconError::MasterData(format!(
            "{}: table '{table}' not found",
            path.display()
        )));
    }
    let missing: Vec<&str> = MASTER_COLUMNS
        .iter()
        .copied()
        .filter(|c| !columns.iter().any(|have| have == c))
        .collect();
    if !missing.is_empty() {
        debug!("master table '{table}' is missing: {}", missing.join(", "));
        return Err(ReconError::SchemaMismatch {
            source_name: format!("{} [{table}]", path.display()),
            expected: MASTER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            found: columns,
        });
    }

    let select = MASTER_COLUMNS
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT {select} FROM {}", quote_ident(table));
    let mut stmt = conn.prepare(&sql).map_err(master_err)?;
    let rows = stmt
        .query_map([], |row| {
            let text = |i: usize| -> rusqlite::Result<Option<String>> {
                Ok(value_text(row.get_ref(i)?))
            };
            Ok(MasterRow {
                store: text(0)?,
                homologated_store: text(1)?,
                store_type: text(2)?,
                channel: text(3)?,
                chain: text(4)?,
                sub_chain: text(5)?,
                region: text(6)?,
                city: text(7)?,
                core_store: text(8)?,
                promoter: text(9)?,
                product_code: text(10)?,
                homologated_reference: text(11)?,
                category: text(12)?,
                subcategory: text(13)?,
                line: text(14)?,
                subline: text(15)?,
            })
        })
        .map_err(master_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(master_err)?;

    info!("master data: {} rows from {} [{table}]", rows.len(), path.display());
    Ok(rows)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, ReconError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
        .map_err(master_err)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(master_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(master_err)?;
    Ok(names)
}

/// Text form of a stored value. Whole reals print without a fraction so
/// numeric EAN columns join against spreadsheet codes.
fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some((f as i64).to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

fn master_err(e: rusqlite::Error) -> ReconError {
    ReconError::MasterData(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_values_as_text() {
        assert_eq!(value_text(ValueRef::Null), None);
        assert_eq!(value_text(ValueRef::Integer(8806098363391)), Some("8806098363391".into()));
        assert_eq!(value_text(ValueRef::Real(8806098363391.0)), Some("8806098363391".into()));
        assert_eq!(value_text(ValueRef::Real(0.5)), Some("0.5".into()));
        assert_eq!(value_text(ValueRef::Text(b"SI")), Some("SI".into()));
    }
}
