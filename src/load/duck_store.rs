// src/load/duck_store.rs

use duckdb::Connection;
use std::path::Path;
use tracing::debug;

use super::{Destination, Warehouse};
use crate::duck::{
    abandon, append_batches, create_staging_table, open_disk_db, open_mem_db, qualified,
    quote_ident, select_cast_list,
};
use crate::error::{Error, Result};
use crate::process::Table;

/// DuckDB-backed warehouse. Loads stage into a VARCHAR table with the
/// appender, then swap in a single transaction.
pub struct DuckDbWarehouse {
    conn: Connection,
    batch_size: usize,
}

impl DuckDbWarehouse {
    pub fn open(path: impl AsRef<Path>, batch_size: usize) -> duckdb::Result<Self> {
        Ok(Self::with_connection(open_disk_db(path)?, batch_size))
    }

    pub fn in_memory(batch_size: usize) -> duckdb::Result<Self> {
        Ok(Self::with_connection(open_mem_db()?, batch_size))
    }

    pub fn with_connection(conn: Connection, batch_size: usize) -> Self {
        Self {
            conn,
            batch_size: batch_size.max(1),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn stage_name(destination: &Destination) -> String {
        format!("__stage_{}_{}", destination.schema, destination.table)
    }

    fn stage_and_swap(&self, destination: &Destination, table: &Table) -> duckdb::Result<u64> {
        let stage = Self::stage_name(destination);
        let target = qualified(&destination.schema, &destination.table);

        self.conn.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {};",
            quote_ident(&destination.schema)
        ))?;
        create_staging_table(&self.conn, &stage, table.columns())?;
        let staged = append_batches(&self.conn, &stage, table.rows(), self.batch_size)?;
        debug!(%destination, staged, "staged rows");

        self.conn.execute_batch(&format!(
            "BEGIN TRANSACTION;
             DROP TABLE IF EXISTS {target};
             CREATE TABLE {target} AS SELECT {cols} FROM {stage};
             DROP TABLE {stage};
             COMMIT;",
            target = target,
            cols = select_cast_list(table.columns()),
            stage = quote_ident(&stage),
        ))?;

        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {};", target), [], |r| r.get(0))?;
        Ok(count as u64)
    }
}

impl Warehouse for DuckDbWarehouse {
    fn replace_table(&self, destination: &Destination, table: &Table) -> Result<u64> {
        self.stage_and_swap(destination, table).map_err(|e| {
            abandon(&self.conn, &Self::stage_name(destination));
            Error::load(destination, e)
        })
    }
}
