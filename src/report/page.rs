// src/report/page.rs

use tracing::warn;

use super::wire::{BatchGetResponse, RawRow};
use crate::error::{Error, Result};

/// Header names in the order the service emitted them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnHeader {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

/// One row: dimension values plus the first metric value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

/// What to do after the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    NextPage(String),
    NoMorePages,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPage {
    pub header: ColumnHeader,
    pub rows: Vec<ReportRow>,
    pub next: Continuation,
}

impl ReportPage {
    /// Decode a raw `batchGet` body into a validated page.
    pub fn from_json(body: &str) -> Result<Self> {
        let resp: BatchGetResponse = serde_json::from_str(body)
            .map_err(|e| Error::malformed(format!("decoding batchGet response: {}", e)))?;
        Self::try_from(resp)
    }
}

impl TryFrom<BatchGetResponse> for ReportPage {
    type Error = Error;

    fn try_from(resp: BatchGetResponse) -> Result<Self> {
        let mut reports = resp.reports.into_iter();
        let report = reports
            .next()
            .ok_or_else(|| Error::malformed("response carries no reports"))?;
        let extra = reports.count();
        if extra > 0 {
            warn!(extra, "ignoring reports beyond the first");
        }

        let header = ColumnHeader {
            dimensions: report.column_header.dimensions,
            metrics: report
                .column_header
                .metric_header
                .metric_header_entries
                .into_iter()
                .map(|e| e.name)
                .collect(),
        };

        let rows = report
            .data
            .rows
            .into_iter()
            .enumerate()
            .map(|(i, raw)| decode_row(i, raw, &header))
            .collect::<Result<Vec<_>>>()?;

        let next = match report.next_page_token {
            None => Continuation::NoMorePages,
            Some(t) if t.is_empty() => {
                return Err(Error::malformed("nextPageToken is present but empty"))
            }
            Some(t) => Continuation::NextPage(t),
        };

        Ok(ReportPage { header, rows, next })
    }
}

fn decode_row(index: usize, raw: RawRow, header: &ColumnHeader) -> Result<ReportRow> {
    if raw.dimensions.len() != header.dimensions.len() {
        return Err(Error::malformed(format!(
            "row {} has {} dimension values for {} dimension headers",
            index,
            raw.dimensions.len(),
            header.dimensions.len()
        )));
    }
    let first = raw
        .metrics
        .into_iter()
        .next()
        .ok_or_else(|| Error::malformed(format!("row {} has no metric values", index)))?;
    if first.values.len() != header.metrics.len() {
        return Err(Error::malformed(format!(
            "row {} has {} metric values for {} metric headers",
            index,
            first.values.len(),
            header.metrics.len()
        )));
    }
    Ok(ReportRow {
        dimensions: raw.dimensions,
        metrics: first.values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROWS: &str = r#"{
        "reports": [{
            "columnHeader": {
                "dimensions": ["ga:pagePath", "ga:date"],
                "metricHeader": {"metricHeaderEntries": [{"name": "ga:pageviews", "type": "INTEGER"}]}
            },
            "data": {
                "rows": [
                    {"dimensions": ["/a", "20240601"], "metrics": [{"values": ["3"]}]},
                    {"dimensions": ["/b", "(other)"], "metrics": [{"values": ["7"]}, {"values": ["9"]}]}
                ],
                "rowCount": 2
            },
            "nextPageToken": "abc"
        }]
    }"#;

    #[test]
    fn decodes_rows_and_token() {
        let page = ReportPage::from_json(TWO_ROWS).unwrap();
        assert_eq!(page.header.dimensions, vec!["ga:pagePath", "ga:date"]);
        assert_eq!(page.header.metrics, vec!["ga:pageviews"]);
        assert_eq!(page.rows.len(), 2);
        // only the first value set is kept
        assert_eq!(page.rows[1].metrics, vec!["7"]);
        assert_eq!(page.next, Continuation::NextPage("abc".to_string()));
    }

    #[test]
    fn missing_token_means_no_more_pages() {
        let body = r#"{"reports":[{"columnHeader":{"dimensions":["ga:date"],
            "metricHeader":{"metricHeaderEntries":[{"name":"ga:users"}]}},"data":{}}]}"#;
        let page = ReportPage::from_json(body).unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.next, Continuation::NoMorePages);
    }

    #[test]
    fn empty_token_is_rejected() {
        let body = r#"{"reports":[{"columnHeader":{"dimensions":["ga:date"],
            "metricHeader":{"metricHeaderEntries":[{"name":"ga:users"}]}},
            "data":{},"nextPageToken":""}]}"#;
        let err = ReportPage::from_json(body).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn missing_reports_is_malformed() {
        assert!(matches!(
            ReportPage::from_json(r#"{}"#),
            Err(Error::MalformedResponse(_))
        ));
        assert!(matches!(
            ReportPage::from_json(r#"{"reports":[]}"#),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn misaligned_rows_are_malformed() {
        let short_dims = r#"{"reports":[{"columnHeader":{"dimensions":["ga:a","ga:b"],
            "metricHeader":{"metricHeaderEntries":[{"name":"ga:m"}]}},
            "data":{"rows":[{"dimensions":["x"],"metrics":[{"values":["1"]}]}]}}]}"#;
        assert!(matches!(
            ReportPage::from_json(short_dims),
            Err(Error::MalformedResponse(_))
        ));

        let no_metrics = r#"{"reports":[{"columnHeader":{"dimensions":["ga:a"],
            "metricHeader":{"metricHeaderEntries":[{"name":"ga:m"}]}},
            "data":{"rows":[{"dimensions":["x"]}]}}]}"#;
        assert!(matches!(
            ReportPage::from_json(no_metrics),
            Err(Error::MalformedResponse(_))
        ));
    }
}
