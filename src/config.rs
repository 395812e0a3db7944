// src/config.rs

use serde::Deserialize;
use std::{env, fs, path::PathBuf};

use crate::error::{Error, Result};
use crate::schedule::offset_from_hours;

pub const DEFAULT_ENDPOINT: &str = "https://analyticsreporting.googleapis.com/v4/reports:batchGet";
pub const DEFAULT_SCHEMA: &str = "ga_staging";
pub const DEFAULT_PAGE_SIZE: u32 = 10_000;
pub const DEFAULT_BATCH_SIZE: usize = 50_000;
/// West Africa Time.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 1;

/// Where the combined table ends up.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WarehouseConfig {
    Duckdb { path: PathBuf },
    Parquet { dir: PathBuf },
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        WarehouseConfig::Duckdb {
            path: PathBuf::from("warehouse.duckdb"),
        }
    }
}

/// Settings that stay fixed across runs.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub view_id: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_utc_offset_hours() -> i32 {
    DEFAULT_UTC_OFFSET_HOURS
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            view_id: String::new(),
            access_token: String::new(),
            endpoint: default_endpoint(),
            schema_name: default_schema(),
            warehouse: WarehouseConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

impl JobConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| Error::Config(format!("parsing yaml: {}", e)))
    }

    /// YAML file from `GAPULL_CONFIG` (if set), then env overrides, then validation.
    pub fn load() -> Result<Self> {
        Self::load_with(|k| env::var(k).ok())
    }

    /// `load` with variables read through `lookup` instead of the process env.
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("GAPULL_CONFIG") {
            Some(path) => {
                let text = fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("reading {}: {}", path, e)))?;
                Self::from_yaml_str(&text)?
            }
            None => JobConfig::default(),
        };
        cfg.apply_overrides(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `GA_*` / `GAPULL_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GA_VIEW_ID") {
            self.view_id = v;
        }
        if let Some(v) = lookup("GA_ACCESS_TOKEN") {
            self.access_token = v;
        }
        if let Some(v) = lookup("GA_ENDPOINT") {
            self.endpoint = v;
        }
        if let Some(v) = lookup("GAPULL_SCHEMA") {
            self.schema_name = v;
        }
        if let Some(v) = lookup("GAPULL_DUCKDB_PATH") {
            self.warehouse = WarehouseConfig::Duckdb { path: v.into() };
        }
        if let Some(v) = lookup("GAPULL_PARQUET_DIR") {
            self.warehouse = WarehouseConfig::Parquet { dir: v.into() };
        }
        if let Some(v) = lookup("GAPULL_BATCH_SIZE") {
            self.batch_size = v
                .parse()
                .map_err(|e| Error::Config(format!("GAPULL_BATCH_SIZE={:?}: {}", v, e)))?;
        }
        if let Some(v) = lookup("GAPULL_UTC_OFFSET_HOURS") {
            self.utc_offset_hours = v
                .parse()
                .map_err(|e| Error::Config(format!("GAPULL_UTC_OFFSET_HOURS={:?}: {}", v, e)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.view_id.trim().is_empty() {
            return Err(Error::Config("view_id is required (GA_VIEW_ID)".into()));
        }
        if self.access_token.trim().is_empty() {
            return Err(Error::Config(
                "access_token is required (GA_ACCESS_TOKEN)".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".into()));
        }
        offset_from_hours(self.utc_offset_hours)?;
        Ok(())
    }
}
