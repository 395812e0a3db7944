use anyhow::Result;
use chrono::Utc;
use gapull::{
    config::JobConfig,
    job::{execute_payload, handle},
    Error,
};
use std::{env, fs, io::Read};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Trigger payload from the file named by the first argument, or stdin.
fn read_payload() -> gapull::Result<String> {
    match env::args().nth(1) {
        Some(path) => fs::read_to_string(&path)
            .map_err(|e| Error::InvalidTrigger(format!("reading {}: {}", path, e))),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map_err(|e| {
                Error::InvalidTrigger(format!("reading trigger payload from stdin: {}", e))
            })?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) config + trigger + run, reported in one place ────────────
    handle(async {
        let config = JobConfig::load()?;
        let payload = read_payload()?;
        execute_payload(&config, &payload, Utc::now()).await
    })
    .await?;
    Ok(())
}
