// src/fetch/request.rs

use chrono::NaiveDate;

use crate::report::wire::{BatchGetRequest, DateRange, DimensionSpec, MetricSpec, ReportRequest};
use crate::trigger::RunConfig;

/// Token that asks for the first page.
pub const FIRST_PAGE_TOKEN: &str = "0";

/// Build the `batchGet` body for one page of a single-day report.
pub fn build_request(
    view_id: &str,
    run: &RunConfig,
    page_size: u32,
    page_token: &str,
    day: NaiveDate,
) -> BatchGetRequest {
    let day = day.format("%Y-%m-%d").to_string();
    BatchGetRequest {
        report_requests: vec![ReportRequest {
            view_id: view_id.to_string(),
            date_ranges: vec![DateRange {
                start_date: day.clone(),
                end_date: day,
            }],
            metrics: run
                .metrics
                .iter()
                .map(|m| MetricSpec {
                    expression: m.clone(),
                })
                .collect(),
            dimensions: run
                .dimensions
                .iter()
                .map(|d| DimensionSpec { name: d.clone() })
                .collect(),
            page_size: page_size.to_string(),
            page_token: page_token.to_string(),
        }],
    }
}
