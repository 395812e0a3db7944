// src/report/wire.rs
//
// JSON shapes of the Analytics Reporting API v4 `reports:batchGet` call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetRequest {
    pub report_requests: Vec<ReportRequest>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub view_id: String,
    pub date_ranges: Vec<DateRange>,
    pub metrics: Vec<MetricSpec>,
    pub dimensions: Vec<DimensionSpec>,
    pub page_size: String,
    pub page_token: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricSpec {
    pub expression: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DimensionSpec {
    pub name: String,
}

// ----- response -----

#[derive(Debug, Deserialize)]
pub struct BatchGetResponse {
    pub reports: Vec<Report>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub column_header: RawColumnHeader,
    #[serde(default)]
    pub data: ReportData,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawColumnHeader {
    #[serde(default)]
    pub dimensions: Vec<String>,
    pub metric_header: MetricHeader,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricHeader {
    #[serde(default)]
    pub metric_header_entries: Vec<MetricHeaderEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MetricHeaderEntry {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(default)]
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<DateRangeValues>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeValues {
    pub values: Vec<String>,
}
