// src/config/consts.rs

// Target
pub const BASE_URL: &str = "https://www.olx.pl/nieruchomosci/mieszkania/sprzedaz/warszawa/";
pub const USER_AGENT: &str = "flat_scrape/0.3 (+sequential, polite)";

// Local store
pub const STORE_DIR: &str = ".store";
pub const LOG_FILE: &str = "debug.log";
pub const LOG_ENV: &str = "FLAT_SCRAPE_LOG";

// Export
pub const DEFAULT_OUT_DIR: &str = "out";
pub const DEFAULT_FILE: &str = "flats.json";

// Concurrency
pub const WORKERS: usize = 1; // one line at a time unless asked
pub const MAX_WORKERS: usize = 4;
pub const REQUEST_PAUSE_MS: u64 = 500; // per host, be polite

// Transport
pub const REQUEST_TIMEOUT_SECS: u64 = 20;
pub const MAX_RETRIES: u32 = 3;
pub const BACKOFF_BASE_MS: u64 = 1_000;
pub const BACKOFF_MAX_MS: u64 = 16_000;
