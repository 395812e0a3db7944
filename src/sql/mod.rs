// src/sql/mod.rs
//
// Append / delete helpers for jobs that write into a shared DuckDB file
// rather than replacing a table per run.

use duckdb::{Connection, ToSql};
use tracing::info;

use crate::duck::{
    abandon, append_batches, column_defs, create_staging_table, qualified, quote_ident,
    select_cast_list,
};
use crate::error::{Error, Result};
use crate::process::{Cell, ColumnKind, Table};

/// How `push_rows` moves rows into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMethod {
    /// Bulk appender into a staging table, then `INSERT ... SELECT`.
    Appender { batch_size: usize },
    /// One prepared `INSERT` per row inside a transaction.
    Statement,
}

/// Append `table` to `schema.table_name`, creating both if missing.
/// Returns the number of rows added.
pub fn push_rows(
    conn: &Connection,
    table: &Table,
    table_name: &str,
    schema: &str,
    method: InsertMethod,
) -> Result<usize> {
    let target = qualified(schema, table_name);
    let added = push_rows_inner(conn, table, table_name, schema, &target, method)
        .map_err(|e| Error::load(format!("{}.{}", schema, table_name), e))?;
    info!("{} Records successfully added to {}.", added, table_name);
    Ok(added)
}

fn push_rows_inner(
    conn: &Connection,
    table: &Table,
    table_name: &str,
    schema: &str,
    target: &str,
    method: InsertMethod,
) -> duckdb::Result<usize> {
    if !table.has_columns() {
        return Ok(0);
    }
    conn.execute_batch(&format!(
        "CREATE SCHEMA IF NOT EXISTS {}; CREATE TABLE IF NOT EXISTS {} ({});",
        quote_ident(schema),
        target,
        column_defs(table.columns())
    ))?;
    let names = table
        .columns()
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    match method {
        InsertMethod::Appender { batch_size } => {
            let stage = format!("__append_{}_{}", schema, table_name);
            let res = (|| -> duckdb::Result<usize> {
                create_staging_table(conn, &stage, table.columns())?;
                let n = append_batches(conn, &stage, table.rows(), batch_size)?;
                conn.execute_batch(&format!(
                    "BEGIN TRANSACTION;
                     INSERT INTO {target} ({names}) SELECT {cols} FROM {stage};
                     DROP TABLE {stage};
                     COMMIT;",
                    target = target,
                    names = names,
                    cols = select_cast_list(table.columns()),
                    stage = quote_ident(&stage),
                ))?;
                Ok(n)
            })();
            if res.is_err() {
                abandon(conn, &stage);
            }
            res
        }
        InsertMethod::Statement => {
            let placeholders = table
                .columns()
                .iter()
                .map(|c| match c.kind {
                    ColumnKind::Text => "?",
                    ColumnKind::Date => "CAST(? AS DATE)",
                })
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("INSERT INTO {} ({}) VALUES ({})", target, names, placeholders);

            conn.execute_batch("BEGIN TRANSACTION;")?;
            let res = (|| -> duckdb::Result<usize> {
                let mut stmt = conn.prepare(&sql)?;
                for row in table.rows() {
                    let owned: Vec<String> = row.iter().map(Cell::to_sql_text).collect();
                    let params: Vec<&dyn ToSql> = owned.iter().map(|s| s as &dyn ToSql).collect();
                    stmt.execute(params.as_slice())?;
                }
                Ok(table.num_rows())
            })();
            match res {
                Ok(n) => {
                    conn.execute_batch("COMMIT;")?;
                    Ok(n)
                }
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK;");
                    Err(e)
                }
            }
        }
    }
}

/// Run a delete statement against `table_name`; returns affected rows.
pub fn delete_rows(conn: &Connection, table_name: &str, query: &str) -> Result<usize> {
    let deleted = conn
        .execute(query, [])
        .map_err(|e| Error::load(table_name, e))?;
    info!(deleted, "Records successfully deleted from {}.", table_name);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duck::open_mem_db;
    use crate::process::Column;
    use chrono::NaiveDate;

    fn sample(n: usize) -> Table {
        let mut t = Table::new(vec![Column::date("date"), Column::text("source")]);
        for i in 0..n {
            let day = NaiveDate::from_ymd_opt(2024, 6, 1 + (i % 2) as u32).unwrap();
            t.push_row(vec![Cell::Date(day), Cell::Text(format!("s{}", i))])
                .unwrap();
        }
        t
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM ga_staging.sessions", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn appender_appends() {
        let conn = open_mem_db().unwrap();
        let method = InsertMethod::Appender { batch_size: 3 };
        assert_eq!(push_rows(&conn, &sample(4), "sessions", "ga_staging", method).unwrap(), 4);
        assert_eq!(push_rows(&conn, &sample(4), "sessions", "ga_staging", method).unwrap(), 4);
        assert_eq!(count(&conn), 8);
    }

    #[test]
    fn statements_append_with_typed_dates() {
        let conn = open_mem_db().unwrap();
        push_rows(&conn, &sample(3), "sessions", "ga_staging", InsertMethod::Statement).unwrap();
        assert_eq!(count(&conn), 3);

        let ty: String = conn
            .query_row(
                r#"SELECT typeof("date") FROM ga_staging.sessions LIMIT 1"#,
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(ty, "DATE");
    }

    #[test]
    fn delete_matching_rows() {
        let conn = open_mem_db().unwrap();
        push_rows(&conn, &sample(6), "sessions", "ga_staging", InsertMethod::Statement).unwrap();

        let deleted = delete_rows(
            &conn,
            "sessions",
            "DELETE FROM ga_staging.sessions WHERE \"date\" = DATE '2024-06-02'",
        )
        .unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(count(&conn), 3);
    }

    #[test]
    fn bad_delete_is_a_load_error() {
        let conn = open_mem_db().unwrap();
        let err = delete_rows(&conn, "nope", "DELETE FROM missing_table").unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
