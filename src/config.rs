use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::pipeline::RetryPolicy;

const CONFIG_FILE: &str = "courtcase.toml";
const ENV_PREFIX: &str = "COURTCASE";
const DEFAULT_DB_PATH: &str = "data/cases.db";
const DEFAULT_USER_AGENT: &str = concat!("court_scraper/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Plain HTTP GET; fine for server-rendered pages.
    Http,
    /// Rendered fetch through spider.cloud for pages that bind content client-side.
    Spider,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub fetcher: FetcherKind,
    pub fetch_attempts: u32,
    pub retry_wait_secs: u64,
    pub fetch_timeout_secs: u64,
    pub max_concurrency: usize,
    pub user_agent: String,
    pub spider_api_key: Option<String>,
}

impl Settings {
    /// Defaults, then `courtcase.toml` if present, then `COURTCASE_*` env vars.
    pub fn load() -> Result<Self> {
        Self::from_file(Path::new(CONFIG_FILE))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("fetcher", "http")?
            .set_default("fetch_attempts", 3_i64)?
            .set_default("retry_wait_secs", 2_i64)?
            .set_default("fetch_timeout_secs", 30_i64)?
            .set_default("max_concurrency", 10_i64)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("Failed to load settings from {:?}", path))?;

        settings
            .try_deserialize()
            .context("Invalid court_scraper settings")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.fetch_attempts.max(1),
            wait: Duration::from_secs(self.retry_wait_secs),
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
