// src/load/parquet_store.rs

use anyhow::{anyhow, Context};
use arrow::array::{ArrayRef, Date32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

use super::{Destination, Warehouse};
use crate::error::{Error, Result};
use crate::process::{Cell, Column, ColumnKind, Table};

/// One Parquet file per table at `<root>/<schema>/<table>.parquet`.
pub struct ParquetWarehouse {
    root: PathBuf,
    batch_size: usize,
}

impl ParquetWarehouse {
    pub fn new(root: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            root: root.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn table_path(&self, destination: &Destination) -> PathBuf {
        self.root
            .join(&destination.schema)
            .join(format!("{}.parquet", destination.table))
    }
}

impl Warehouse for ParquetWarehouse {
    fn replace_table(&self, destination: &Destination, table: &Table) -> Result<u64> {
        let path = self.table_path(destination);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        let tmp = dir.join(format!(".{}.parquet.tmp", destination.table));

        let written = (|| -> anyhow::Result<u64> {
            fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
            let rows = write_parquet(&tmp, table, self.batch_size)?;
            // swap: rename over the previous file
            fs::rename(&tmp, &path)
                .with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
            Ok(rows)
        })();

        written.map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::load(destination, e)
        })
    }
}

fn arrow_schema(columns: &[Column]) -> Schema {
    Schema::new(
        columns
            .iter()
            .map(|c| {
                let ty = match c.kind {
                    ColumnKind::Text => DataType::Utf8,
                    ColumnKind::Date => DataType::Date32,
                };
                Field::new(&c.name, ty, false)
            })
            .collect::<Vec<_>>(),
    )
}

fn days_since_epoch(d: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    d.signed_duration_since(epoch).num_days() as i32
}

fn record_batch(schema: Arc<Schema>, columns: &[Column], rows: &[Vec<Cell>]) -> anyhow::Result<RecordBatch> {
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
    for (idx, col) in columns.iter().enumerate() {
        let array: ArrayRef = match col.kind {
            ColumnKind::Text => {
                let values = rows
                    .iter()
                    .map(|r| {
                        r[idx]
                            .as_text()
                            .ok_or_else(|| anyhow!("column {} holds a non-text cell", col.name))
                    })
                    .collect::<anyhow::Result<Vec<&str>>>()?;
                Arc::new(StringArray::from(values))
            }
            ColumnKind::Date => {
                let values = rows
                    .iter()
                    .map(|r| {
                        r[idx]
                            .as_date()
                            .map(days_since_epoch)
                            .ok_or_else(|| anyhow!("column {} holds a non-date cell", col.name))
                    })
                    .collect::<anyhow::Result<Vec<i32>>>()?;
                Arc::new(Date32Array::from(values))
            }
        };
        arrays.push(array);
    }
    RecordBatch::try_new(schema, arrays).context("building record batch")
}

fn write_parquet(path: &Path, table: &Table, batch_size: usize) -> anyhow::Result<u64> {
    let schema = Arc::new(arrow_schema(table.columns()));
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))
        .context("creating Arrow writer")?;

    let mut written = 0u64;
    for chunk in table.rows().chunks(batch_size) {
        let batch = record_batch(schema.clone(), table.columns(), chunk)?;
        writer.write(&batch).context("writing batch")?;
        written += chunk.len() as u64;
        debug!(path = %path.display(), rows = chunk.len(), "wrote batch");
    }
    writer.close().context("closing Arrow writer")?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::load;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    fn table(n: usize) -> Table {
        let mut t = Table::new(vec![Column::date("date"), Column::text("users")]);
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        for i in 0..n {
            t.push_row(vec![Cell::Date(day), Cell::Text(i.to_string())])
                .unwrap();
        }
        t
    }

    fn read_back(path: &Path) -> (usize, DataType) {
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap()).unwrap();
        let date_type = builder.schema().field(0).data_type().clone();
        let rows = builder
            .build()
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .sum();
        (rows, date_type)
    }

    #[test]
    fn replace_overwrites_file() {
        let tmp = tempdir().unwrap();
        let wh = ParquetWarehouse::new(tmp.path(), 30);
        let dest = Destination::new("ga_staging", "analytics_20240601");

        assert_eq!(load(&wh, &table(100), &dest).unwrap(), 100);
        assert_eq!(load(&wh, &table(50), &dest).unwrap(), 50);

        let path = wh.table_path(&dest);
        let (rows, ty) = read_back(&path);
        assert_eq!(rows, 50);
        assert_eq!(ty, DataType::Date32);

        // no temp files left behind
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let tmp = tempdir().unwrap();
        let wh = ParquetWarehouse::new(tmp.path(), 10);
        let dest = Destination::new("ga_staging", "t");
        wh.replace_table(&dest, &table(3)).unwrap();

        let mut bad = Table::new(vec![Column::date("date"), Column::text("users")]);
        bad.push_row(vec![Cell::Text("oops".into()), Cell::Text("1".into())])
            .unwrap();
        let err = wh.replace_table(&dest, &bad).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));

        let (rows, _) = read_back(&wh.table_path(&dest));
        assert_eq!(rows, 3);
    }

    #[test]
    fn epoch_offsets() {
        assert_eq!(days_since_epoch(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
        assert_eq!(days_since_epoch(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()), 19875);
    }
}
