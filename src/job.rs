// src/job.rs

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use std::future::Future;
use tracing::{error, info};

use crate::config::JobConfig;
use crate::error::{Error, Result};
use crate::fetch::{AnalyticsClient, ReportSource};
use crate::load::{load, open_warehouse, Destination, Warehouse};
use crate::pipeline;
use crate::schedule::{offset_from_hours, target_day_at};
use crate::trigger::{RunConfig, TriggerEvent};

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub destination: Destination,
    pub day: NaiveDate,
    pub pages: usize,
    pub rows_loaded: u64,
}

/// Pull `day` from `source` and replace `<schema>.<table>_<day>` with it.
/// The warehouse is only touched once every page has been pulled.
pub async fn run_job<S, W>(
    source: &S,
    warehouse: &W,
    run: &RunConfig,
    day: NaiveDate,
    schema: &str,
) -> Result<JobReport>
where
    S: ReportSource + ?Sized,
    W: Warehouse + ?Sized,
{
    let destination = Destination::new(schema, run.table_name(day));
    info!(%destination, %day, "pulling report");

    let pulled = pipeline::run(source, day).await?;
    let rows_loaded = load(warehouse, &pulled.table, &destination)?;

    Ok(JobReport {
        destination,
        day,
        pages: pulled.pages,
        rows_loaded,
    })
}

/// Resolve the trigger against `config` at `now` and run the job.
pub async fn execute(
    config: &JobConfig,
    event: &TriggerEvent,
    now: DateTime<Utc>,
) -> Result<JobReport> {
    info!(%now, "job triggered");
    let run = RunConfig::from_event(event)?;
    let day = target_day_at(now, offset_from_hours(config.utc_offset_hours)?);

    let client = AnalyticsClient::new(Client::new(), config, run.clone())?;
    let warehouse = open_warehouse(&config.warehouse, config.batch_size)?;
    run_job(&client, warehouse.as_ref(), &run, day, &config.schema_name).await
}

/// Await a whole run (config, trigger parsing and the job itself) and log
/// its outcome. Every failure goes through `report_failure` here.
pub async fn handle<F>(run: F) -> Result<JobReport>
where
    F: Future<Output = Result<JobReport>>,
{
    match run.await {
        Ok(report) => {
            info!(
                destination = %report.destination,
                day = %report.day,
                pages = report.pages,
                rows = report.rows_loaded,
                "all done"
            );
            Ok(report)
        }
        Err(err) => {
            report_failure(&err);
            Err(err)
        }
    }
}

/// Parse a raw trigger payload and run it.
pub async fn execute_payload(
    config: &JobConfig,
    payload: &str,
    now: DateTime<Utc>,
) -> Result<JobReport> {
    let event = TriggerEvent::from_json(payload)?;
    execute(config, &event, now).await
}

/// Hand a failed run to the error log.
pub fn report_failure(err: &Error) {
    let kind = match err {
        Error::Transport(_) | Error::Status { .. } => "transport",
        Error::MalformedResponse(_) => "malformed_response",
        Error::Load { .. } => "load",
        Error::InvalidTrigger(_) => "trigger",
        Error::Config(_) => "config",
    };
    error!(kind, error = %err, "run failed");
}
