// src/process/mod.rs

pub mod date_parser;
pub mod flatten;
pub mod table;

use tracing::debug;

use crate::error::{Error, Result};
use date_parser::parse_report_date;
pub use flatten::{flatten, normalize_column};
pub use table::{Cell, Column, ColumnKind, FlatRow, Table};

pub const DATE_COLUMN: &str = "date";
/// Value the service puts in `ga:date` for rows it rolled up.
pub const OTHER_SENTINEL: &str = "(other)";

/// Drop rows whose `date` is the `(other)` sentinel. Returns how many went.
pub fn drop_other_rows(table: &mut Table) -> usize {
    if table.column_index(DATE_COLUMN).is_none() {
        return 0;
    }
    table.retain_rows(|row| {
        row.get(DATE_COLUMN).and_then(Cell::as_text) != Some(OTHER_SENTINEL)
    })
}

/// Turn the `date` column into calendar dates.
pub fn parse_date_column(table: &mut Table) -> Result<()> {
    let Some(idx) = table.column_index(DATE_COLUMN) else {
        return Ok(());
    };
    table.convert_column(idx, ColumnKind::Date, |cell| match cell {
        Cell::Date(d) => Ok(Cell::Date(*d)),
        Cell::Text(s) => parse_report_date(s)
            .map(Cell::Date)
            .ok_or_else(|| Error::malformed(format!("unparseable date {:?}", s))),
    })
}

/// Flatten a page and get it ready to be appended to the combined table.
pub fn prepare_page(page: &crate::report::ReportPage) -> Result<Table> {
    let mut table = flatten(page)?;
    if !table.has_columns() {
        return Ok(table);
    }
    if table.column_index(DATE_COLUMN).is_none() {
        debug!("page has no date column; nothing to filter or parse");
    }
    let dropped = drop_other_rows(&mut table);
    if dropped > 0 {
        debug!(dropped, "dropped {} rows", OTHER_SENTINEL);
    }
    parse_date_column(&mut table)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dated(values: &[(&str, &str)]) -> Table {
        let mut t = Table::new(vec![Column::text("date"), Column::text("users")]);
        for (d, u) in values {
            t.push_row(vec![Cell::Text(d.to_string()), Cell::Text(u.to_string())])
                .unwrap();
        }
        t
    }

    #[test]
    fn other_rows_go_and_dates_parse() {
        let mut t = dated(&[("20240601", "1"), ("(other)", "9"), ("20240602", "2")]);
        assert_eq!(drop_other_rows(&mut t), 1);
        parse_date_column(&mut t).unwrap();

        assert_eq!(t.columns()[0].kind, ColumnKind::Date);
        let dates: Vec<_> = t
            .iter_rows()
            .map(|r| r.get("date").and_then(Cell::as_date).unwrap())
            .collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
            ]
        );
    }

    #[test]
    fn bad_date_is_malformed() {
        let mut t = dated(&[("yesterday", "1")]);
        assert!(matches!(
            parse_date_column(&mut t),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn no_date_column_is_left_alone() {
        let mut t = Table::new(vec![Column::text("pagepath")]);
        t.push_row(vec![Cell::Text("(other)".into())]).unwrap();
        assert_eq!(drop_other_rows(&mut t), 0);
        parse_date_column(&mut t).unwrap();
        assert_eq!(t.columns()[0].kind, ColumnKind::Text);
    }
}
