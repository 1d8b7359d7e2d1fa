// src/error.rs
//! Crate-wide error taxonomy.
//!
//! The variants map onto how far a failure is allowed to travel:
//! - `Config`: bad selection or untrusted catalog. Aborts the run before crawling.
//! - `UnknownDomain`: a listing points at a site we have no extractor for. Skips that listing.
//! - `Transport`: network failure or timeout. Retried, then aborts one query line.
//! - `Http`: the server answered with an error status. Only 5xx and 429 are retried.
//! - `Extraction` / `Parse`: per-field. The field is recorded absent.

use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unrecognized source domain: {0}")]
    UnknownDomain(String),

    #[error("transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Error::Extraction(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        Error::Transport { url: url.into(), reason: reason.to_string() }
    }

    pub fn http(url: impl Into<String>, status: u16) -> Self {
        Error::Http { url: url.into(), status }
    }

    /// Network failures, server errors and throttling are worth another attempt;
    /// other error statuses (an expired offer's 404) are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } => true,
            Error::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Config(format!("invalid URL: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_server_errors_and_throttling_retry() {
        assert!(Error::transport("u", "reset").is_retryable());
        assert!(Error::http("u", 503).is_retryable());
        assert!(Error::http("u", 429).is_retryable());
        assert!(!Error::http("u", 404).is_retryable());
        assert!(!Error::http("u", 410).is_retryable());
        assert!(!Error::parse("x").is_retryable());
    }
}
