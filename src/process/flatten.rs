// src/process/flatten.rs

use std::collections::HashSet;

use super::table::{Cell, Column, Table};
use crate::error::{Error, Result};
use crate::report::ReportPage;

/// Namespace every reporting field name starts with.
pub const NAMESPACE_PREFIX: &str = "ga:";

/// Lowercase, then remove every `ga:`, including inside metric expressions
/// such as `ga:sessions/ga:users`. Repeats until none is left, so
/// `normalize_column(normalize_column(x)) == normalize_column(x)`.
pub fn normalize_column(name: &str) -> String {
    let mut name = name.to_lowercase();
    while name.contains(NAMESPACE_PREFIX) {
        name = name.replace(NAMESPACE_PREFIX, "");
    }
    name
}

/// Flatten one page into a table: dimension columns first, then metrics.
/// A page without rows gives an empty table with no columns.
pub fn flatten(page: &ReportPage) -> Result<Table> {
    if page.rows.is_empty() {
        return Ok(Table::default());
    }

    let header = &page.header;
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(header.dimensions.len() + header.metrics.len());
    for raw in header.dimensions.iter().chain(header.metrics.iter()) {
        let name = normalize_column(raw);
        if !seen.insert(name.clone()) {
            return Err(Error::malformed(format!(
                "header {:?} collides with another column as {:?}",
                raw, name
            )));
        }
        columns.push(Column::text(name));
    }

    let mut table = Table::new(columns);
    for (i, row) in page.rows.iter().enumerate() {
        if row.dimensions.len() != header.dimensions.len()
            || row.metrics.len() != header.metrics.len()
        {
            return Err(Error::malformed(format!(
                "row {} has {}+{} values for {}+{} headers",
                i,
                row.dimensions.len(),
                row.metrics.len(),
                header.dimensions.len(),
                header.metrics.len()
            )));
        }
        let cells = row
            .dimensions
            .iter()
            .chain(row.metrics.iter())
            .map(|v| Cell::Text(v.clone()))
            .collect();
        table.push_row(cells)?;
    }
    Ok(table)
}
