// src/duck/mod.rs

use duckdb::{Connection, ToSql};
use std::path::Path;
use tracing::debug;

use crate::process::{Cell, Column, ColumnKind};

/// Open a DuckDB database on disk at `path`, creating the file if it doesn't exist.
pub fn open_disk_db(path: impl AsRef<Path>) -> duckdb::Result<Connection> {
    Connection::open(path)
}

/// Open a DuckDB in‐memory database
pub fn open_mem_db() -> duckdb::Result<Connection> {
    Connection::open_in_memory()
}

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

pub fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Text => "VARCHAR",
        ColumnKind::Date => "DATE",
    }
}

/// `"a" VARCHAR, "date" DATE`
pub fn column_defs(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(c.kind)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Projection that turns an all-VARCHAR staging table into the typed columns.
pub fn select_cast_list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| {
            let col = quote_ident(&c.name);
            match c.kind {
                ColumnKind::Text => col,
                ColumnKind::Date => format!("CAST({col} AS DATE) AS {col}"),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// (Re)create an all-VARCHAR staging table in the main schema.
pub fn create_staging_table(conn: &Connection, stage: &str, columns: &[Column]) -> duckdb::Result<()> {
    let defs = columns
        .iter()
        .map(|c| format!("{} VARCHAR", quote_ident(&c.name)))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {stage}; CREATE TABLE {stage} ({defs});",
        stage = quote_ident(stage),
        defs = defs
    ))
}

/// Append `rows` to `stage` through the appender, flushing every `batch_size` rows.
/// Returns the number of rows appended.
pub fn append_batches(
    conn: &Connection,
    stage: &str,
    rows: &[Vec<Cell>],
    batch_size: usize,
) -> duckdb::Result<usize> {
    let mut appender = conn.appender(stage)?;
    let mut appended = 0;
    for (i, batch) in rows.chunks(batch_size.max(1)).enumerate() {
        for row in batch {
            let owned: Vec<String> = row.iter().map(Cell::to_sql_text).collect();
            let params: Vec<&dyn ToSql> = owned.iter().map(|s| s as &dyn ToSql).collect();
            appender.append_row(params.as_slice())?;
        }
        appender.flush()?;
        appended += batch.len();
        debug!(stage, batch = i, rows = batch.len(), "flushed batch");
    }
    Ok(appended)
}

/// Best-effort cleanup after a failed stage or swap.
pub fn abandon(conn: &Connection, stage: &str) {
    let _ = conn.execute_batch("ROLLBACK;");
    let _ = conn.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(stage)));
}
