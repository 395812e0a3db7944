// src/pipeline.rs

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::fetch::{ReportSource, FIRST_PAGE_TOKEN};
use crate::process::{prepare_page, Table};
use crate::report::Continuation;

/// Combined table plus how many pages it took.
#[derive(Debug, Clone)]
pub struct PullResult {
    pub table: Table,
    pub pages: usize,
}

/// Pull every page of `day`'s report and concatenate them.
/// Any failure aborts the whole pull; nothing partial is returned.
#[instrument(level = "info", skip(source))]
pub async fn run<S>(source: &S, day: NaiveDate) -> Result<PullResult>
where
    S: ReportSource + ?Sized,
{
    let mut token = FIRST_PAGE_TOKEN.to_string();
    let mut combined = Table::default();
    let mut pages = 0usize;

    loop {
        let page = source.fetch(&token, day).await?;
        pages += 1;
        let fetched = page.rows.len();

        let table = prepare_page(&page)?;
        info!(page = pages, fetched, kept = table.num_rows(), "page flattened");
        combined.append(table)?;

        match page.next {
            Continuation::NextPage(next) => {
                if next == token {
                    return Err(Error::malformed(format!(
                        "nextPageToken {:?} repeats the token just used",
                        next
                    )));
                }
                token = next;
            }
            Continuation::NoMorePages => break,
        }
    }

    info!(pages, rows = combined.num_rows(), "no more pages to retrieve");
    Ok(PullResult {
        table: combined,
        pages,
    })
}
