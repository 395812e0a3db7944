// src/fetch/mod.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::config::JobConfig;
use crate::error::{Error, Result};
use crate::report::ReportPage;
use crate::trigger::RunConfig;

pub mod request;

pub use request::{build_request, FIRST_PAGE_TOKEN};

/// Anything that can hand out report pages for a day.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch(&self, page_token: &str, day: NaiveDate) -> Result<ReportPage>;
}

/// Reporting API client bound to one view and one dimension/metric set.
pub struct AnalyticsClient {
    http: Client,
    endpoint: Url,
    view_id: String,
    access_token: String,
    page_size: u32,
    run: RunConfig,
}

impl AnalyticsClient {
    pub fn new(http: Client, config: &JobConfig, run: RunConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| Error::Config(format!("endpoint {:?}: {}", config.endpoint, e)))?;
        Ok(Self {
            http,
            endpoint,
            view_id: config.view_id.clone(),
            access_token: config.access_token.clone(),
            page_size: config.page_size,
            run,
        })
    }
}

#[async_trait]
impl ReportSource for AnalyticsClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, page_token: &str, day: NaiveDate) -> Result<ReportPage> {
        let body = build_request(&self.view_id, &self.run, self.page_size, page_token, day);
        debug!(endpoint = %self.endpoint, "POST batchGet");

        let resp = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Status { status, body: text });
        }
        debug!(bytes = text.len(), "received report page");

        ReportPage::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Continuation;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer exactly one HTTP request with `status_line` and `body`;
    /// the join handle yields the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= pos + 4 + len {
                        break;
                    }
                }
            }
            let resp = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{}/v4/reports:batchGet", addr), handle)
    }

    fn client_for(endpoint: String) -> AnalyticsClient {
        let cfg = JobConfig {
            view_id: "42".into(),
            access_token: "tok".into(),
            endpoint,
            ..JobConfig::default()
        };
        let run = RunConfig {
            dimensions: vec!["ga:date".into()],
            metrics: vec!["ga:users".into()],
            table_base: "t".into(),
        };
        AnalyticsClient::new(Client::new(), &cfg, run).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_decodes_a_page() {
        let body = r#"{"reports":[{"columnHeader":{"dimensions":["ga:date"],
            "metricHeader":{"metricHeaderEntries":[{"name":"ga:users","type":"INTEGER"}]}},
            "data":{"rows":[{"dimensions":["20240601"],"metrics":[{"values":["5"]}]}]},
            "nextPageToken":"10000"}]}"#;
        let (url, server) = serve_once("200 OK", body).await;
        let client = client_for(url);

        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let page = client.fetch("abc", day).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.next, Continuation::NextPage("10000".into()));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v4/reports:batchGet"));
        assert!(raw.to_lowercase().contains("authorization: bearer tok"));
        assert!(raw.contains(r#""pageToken":"abc""#));
        assert!(raw.contains(r#""startDate":"2024-06-01""#));
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_failure() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"error":"nope"}"#).await;
        let client = client_for(url);

        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let err = client.fetch(FIRST_PAGE_TOKEN, day).await.unwrap_err();
        match err {
            Error::Status { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert!(body.contains("nope"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_failure() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}/v4/reports:batchGet", addr));
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let err = client.fetch(FIRST_PAGE_TOKEN, day).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
