// src/process/table.rs

use chrono::NaiveDate;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn text(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            kind: ColumnKind::Text,
        }
    }

    pub fn date(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            kind: ColumnKind::Date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Date(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(_) => None,
        }
    }

    /// Text form used when staging into SQL (`YYYY-MM-DD` for dates).
    pub fn to_sql_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Row-oriented table; every row has one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

/// Borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct FlatRow<'a> {
    columns: &'a [Column],
    cells: &'a [Cell],
}

impl<'a> FlatRow<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Cell> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .map(|i| &self.cells[i])
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<FlatRow<'_>> {
        self.rows.get(i).map(|cells| FlatRow {
            columns: &self.columns,
            cells,
        })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = FlatRow<'_>> {
        self.rows.iter().map(move |cells| FlatRow {
            columns: &self.columns,
            cells,
        })
    }

    pub fn push_row(&mut self, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::malformed(format!(
                "row has {} cells for {} columns",
                cells.len(),
                self.columns.len()
            )));
        }
        self.rows.push(cells);
        Ok(())
    }

    /// Keep rows for which `keep` returns true; returns how many were dropped.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(FlatRow<'_>) -> bool,
    {
        let before = self.rows.len();
        let columns = &self.columns;
        self.rows.retain(|cells| keep(FlatRow { columns, cells }));
        before - self.rows.len()
    }

    /// Rewrite every cell of column `idx` and set its kind.
    pub fn convert_column<F>(&mut self, idx: usize, kind: ColumnKind, mut f: F) -> Result<()>
    where
        F: FnMut(&Cell) -> Result<Cell>,
    {
        for row in self.rows.iter_mut() {
            row[idx] = f(&row[idx])?;
        }
        self.columns[idx].kind = kind;
        Ok(())
    }

    /// Concatenate `other` below `self`. A table without columns is a no-op on
    /// either side; otherwise both must have the same columns.
    pub fn append(&mut self, other: Table) -> Result<()> {
        if !other.has_columns() {
            return Ok(());
        }
        if !self.has_columns() {
            *self = other;
            return Ok(());
        }
        if self.columns != other.columns {
            return Err(Error::malformed(format!(
                "page columns {:?} differ from earlier pages {:?}",
                other.column_names(),
                self.column_names()
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}
