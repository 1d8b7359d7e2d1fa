// src/config/options.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::consts::*;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            backoff_base_ms: BACKOFF_BASE_MS,
            backoff_max_ms: BACKOFF_MAX_MS,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts; used by tests and dry runs.
    pub fn immediate(max_retries: u32) -> Self {
        Self { max_retries, backoff_base_ms: 0, backoff_max_ms: 0 }
    }

    /// Delay before retry number `attempt` (1-based): base, 2×base, 4×base… capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.backoff_base_ms.saturating_mul(factor).min(self.backoff_max_ms);
        Duration::from_millis(ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlOptions {
    pub base_url: String,
    pub out: PathBuf,
    pub workers: usize,
    pub request_pause_ms: u64,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
    /// Stop a line after this many result pages even if the site has more.
    pub max_pages: Option<u32>,
    pub user_agent: String,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            base_url: s!(BASE_URL),
            out: PathBuf::from(DEFAULT_OUT_DIR).join(DEFAULT_FILE),
            workers: WORKERS,
            request_pause_ms: REQUEST_PAUSE_MS,
            timeout_secs: REQUEST_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            max_pages: None,
            user_agent: s!(USER_AGENT),
        }
    }
}

impl CrawlOptions {
    /// Defaults overlaid with whatever keys the JSON file sets.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let opts: CrawlOptions = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)?;
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(Error::config(format!(
                "workers must be within 1..={MAX_WORKERS}, got {}",
                self.workers
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout must be at least one second"));
        }
        if self.max_pages == Some(0) {
            return Err(Error::config("max pages must be positive"));
        }
        Ok(())
    }

    pub fn request_pause(&self) -> Duration {
        Duration::from_millis(self.request_pause_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
