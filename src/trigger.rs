// src/trigger.rs

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{Error, Result};

pub const DIMENSIONS_ATTR: &str = "DIMENSIONS";
pub const METRICS_ATTR: &str = "METRICS";
pub const TABLE_NAME_ATTR: &str = "TABLE_NAME";

/// A Pub/Sub message as delivered to the job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerEvent {
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Base64 payload. Unused; the run is driven by attributes alone.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Push { message: TriggerEvent },
    Bare(TriggerEvent),
}

impl TriggerEvent {
    /// Accepts either a bare message or a push-subscription envelope.
    pub fn from_json(s: &str) -> Result<Self> {
        let env: Envelope = serde_json::from_str(s)
            .map_err(|e| Error::InvalidTrigger(format!("decoding payload: {}", e)))?;
        Ok(match env {
            Envelope::Push { message } => message,
            Envelope::Bare(ev) => ev,
        })
    }
}

/// Per-run settings taken from the trigger attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub table_base: String,
}

impl RunConfig {
    pub fn from_event(event: &TriggerEvent) -> Result<Self> {
        Self::from_attributes(&event.attributes)
    }

    pub fn from_attributes(attrs: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            attrs
                .get(key)
                .ok_or_else(|| Error::InvalidTrigger(format!("missing attribute {}", key)))
        };
        let dimensions = split_fields(DIMENSIONS_ATTR, get(DIMENSIONS_ATTR)?)?;
        let metrics = split_fields(METRICS_ATTR, get(METRICS_ATTR)?)?;
        let table_base = get(TABLE_NAME_ATTR)?.trim().to_string();
        if table_base.is_empty() {
            return Err(Error::InvalidTrigger(format!("{} is empty", TABLE_NAME_ATTR)));
        }
        // Becomes a table identifier and a file name.
        if !table_base
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::InvalidTrigger(format!(
                "{} may only contain letters, digits and '_': {:?}",
                TABLE_NAME_ATTR, table_base
            )));
        }
        Ok(RunConfig {
            dimensions,
            metrics,
            table_base,
        })
    }

    /// `<base>_<YYYYMMDD>`
    pub fn table_name(&self, day: NaiveDate) -> String {
        format!("{}_{}", self.table_base, day.format("%Y%m%d"))
    }
}

fn split_fields(attr: &str, raw: &str) -> Result<Vec<String>> {
    let fields: Vec<String> = raw.split(',').map(|s| s.trim().to_string()).collect();
    if fields.iter().any(|f| f.is_empty()) {
        return Err(Error::InvalidTrigger(format!(
            "{} contains an empty field: {:?}",
            attr, raw
        )));
    }
    Ok(fields)
}
