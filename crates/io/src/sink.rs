// Sales table persistence (SQLite).
//
// Each run drops and recreates the table. Inserts share one transaction;
// the preceding drop is already committed, so a failed run can leave the
// table missing.

use std::path::Path;

use log::info;
use rusqlite::{params_from_iter, types::Value, Connection};
use sellout_recon::model::{SalesFact, FACT_COLUMNS};
use sellout_recon::ReconError;

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Open `db_path`, replace `table` with `facts`, and close the connection.
pub fn write_sales(db_path: &Path, table: &str, facts: &[SalesFact]) -> Result<usize, ReconError> {
    let mut conn = Connection::open(db_path)
        .map_err(|e| ReconError::Persistence(format!("{}: {e}", db_path.display())))?;
    let written = replace_table(&mut conn, table, facts)?;
    info!("wrote {written} rows to {} [{table}]", db_path.display());
    Ok(written)
}

/// Drop `table` if present, recreate it with the fact columns and insert
/// every row. Returns the number of rows inserted.
pub fn replace_table(
    conn: &mut Connection,
    table: &str,
    facts: &[SalesFact],
) -> Result<usize, ReconError> {
    let name = quote_ident(table);
    conn.execute(&format!("DROP TABLE IF EXISTS {name}"), [])
        .map_err(persist_err)?;
    conn.execute(&create_sql(&name), []).map_err(persist_err)?;

    let placeholders = vec!["?"; FACT_COLUMNS.len()].join(", ");
    let insert = format!("INSERT INTO {name} VALUES ({placeholders})");

    let tx = conn.transaction().map_err(persist_err)?;
    {
        let mut stmt = tx.prepare(&insert).map_err(persist_err)?;
        for fact in facts {
            stmt.execute(params_from_iter(row_values(fact)))
                .map_err(persist_err)?;
        }
    }
    tx.commit().map_err(persist_err)?;
    Ok(facts.len())
}

fn create_sql(quoted_table: &str) -> String {
    let columns: Vec<String> = FACT_COLUMNS
        .iter()
        .map(|c| {
            let ty = match *c {
                "UNITS" | "AMOUNT" => "REAL",
                _ => "TEXT",
            };
            format!("{} {ty}", quote_ident(c))
        })
        .collect();
    format!("CREATE TABLE {quoted_table} ({})", columns.join(", "))
}

fn row_values(f: &SalesFact) -> [Value; 23] {
    let opt = |v: &Option<String>| v.clone().map_or(Value::Null, Value::Text);
    [
        opt(&f.store_type),
        Value::Text(f.record_type.clone()),
        opt(&f.channel),
        opt(&f.chain),
        opt(&f.sub_chain),
        Value::Text(f.store.clone()),
        opt(&f.homologated_store),
        Value::Text(f.product_code.clone()),
        Value::Text(f.model.clone()),
        opt(&f.homologated_reference),
        opt(&f.category),
        opt(&f.subcategory),
        opt(&f.line),
        opt(&f.subline),
        Value::Real(f.units),
        Value::Real(f.amount),
        opt(&f.region),
        opt(&f.city),
        Value::Text(f.week.clone()),
        Value::Text(f.date.format("%Y-%m-%d").to_string()),
        Value::Text(f.month.clone()),
        opt(&f.core_store),
        opt(&f.promoter),
    ]
}

fn persist_err(e: rusqlite::Error) -> ReconError {
    ReconError::Persistence(e.to_string())
}
