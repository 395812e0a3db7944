// src/load/mod.rs

pub mod duck_store;
pub mod parquet_store;

use std::fmt;
use tracing::{info, warn};

use crate::config::WarehouseConfig;
use crate::error::{Error, Result};
use crate::process::Table;

pub use duck_store::DuckDbWarehouse;
pub use parquet_store::ParquetWarehouse;

/// `<schema>.<table>` in the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub schema: String,
    pub table: String,
}

impl Destination {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Destination {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// A store that can swap a whole table in one go.
///
/// Implementations stage the rows first and only replace the destination once
/// staging succeeded, so a failed load leaves the previous contents in place.
pub trait Warehouse {
    /// Replace `destination` with `table`; returns the row count now stored.
    fn replace_table(&self, destination: &Destination, table: &Table) -> Result<u64>;
}

/// Full-replace load with logging. Tables without columns are skipped.
pub fn load<W>(warehouse: &W, table: &Table, destination: &Destination) -> Result<u64>
where
    W: Warehouse + ?Sized,
{
    if !table.has_columns() {
        warn!(%destination, "no rows in any page; leaving destination untouched");
        return Ok(0);
    }
    let loaded = warehouse.replace_table(destination, table)?;
    info!("Loaded {} records to {}", loaded, destination);
    Ok(loaded)
}

/// Build the configured backend.
pub fn open_warehouse(cfg: &WarehouseConfig, batch_size: usize) -> Result<Box<dyn Warehouse>> {
    let warehouse: Box<dyn Warehouse> = match cfg {
        WarehouseConfig::Duckdb { path } => Box::new(
            DuckDbWarehouse::open(path, batch_size)
                .map_err(|e| Error::load(path.display(), e))?,
        ),
        WarehouseConfig::Parquet { dir } => Box::new(ParquetWarehouse::new(dir, batch_size)),
    };
    Ok(warehouse)
}
