// src/core/net.rs
// Blocking HTTP GET with a per-request timeout, per-host pacing and bounded retry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use url::Url;

use crate::config::{CrawlOptions, RetryPolicy};
use crate::error::{Error, Result};

/// A fetched page. `url` is the *resolved* location after redirects,
/// which is what pagination termination is decided on.
#[derive(Clone, Debug)]
pub struct Response {
    pub url: Url,
    pub body: String,
}

/// Transport seam. The crawler only ever talks to this trait, so tests can
/// script responses without a network.
pub trait Fetcher: Send + Sync {
    fn get(&self, url: &Url) -> Result<Response>;
}

pub struct HttpFetcher {
    client: Client,
    pacer: Pacer,
}

impl HttpFetcher {
    pub fn new(opts: &CrawlOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(opts.user_agent.as_str())
            .timeout(opts.timeout())
            .redirect(Policy::limited(10))
            .build()
            .map_err(|e| Error::config(format!("HTTP client: {e}")))?;
        Ok(Self { client, pacer: Pacer::new(opts.request_pause()) })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &Url) -> Result<Response> {
        self.pacer.wait(url);

        let res = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| Error::transport(url.as_str(), describe(&e)))?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::http(url.as_str(), status.as_u16()));
        }
        let resolved = res.url().clone();
        let body = res.text().map_err(|e| Error::transport(url.as_str(), describe(&e)))?;
        Ok(Response { url: resolved, body })
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() { format!("timed out ({e})") } else { e.to_string() }
}

/// GET with bounded exponential backoff. Only retryable errors (network, 5xx, 429)
/// are retried; anything else comes straight back.
pub fn get_with_retry(fetcher: &dyn Fetcher, url: &Url, policy: &RetryPolicy) -> Result<Response> {
    let mut attempt = 0u32;
    loop {
        match fetcher.get(url) {
            Ok(res) => return Ok(res),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                logw!(url = %url, attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying request");
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Minimum interval between requests to the same host, shared by all workers.
pub struct Pacer {
    interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, next_slot: Mutex::new(HashMap::new()) }
    }

    /// Reserve the next slot for `url`'s host and sleep until it opens.
    pub fn wait(&self, url: &Url) {
        if self.interval.is_zero() {
            return;
        }
        let host = url.host_str().unwrap_or_default().to_string();
        let wait = {
            let mut slots = self.next_slot.lock().unwrap_or_else(|p| p.into_inner());
            let now = Instant::now();
            let slot = slots.get(&host).copied().unwrap_or(now).max(now);
            slots.insert(host, slot + self.interval);
            slot - now
        };
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }
}
