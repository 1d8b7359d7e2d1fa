// src/cli.rs
use std::{env, fs, path::PathBuf};

use crate::config::CrawlOptions;
use crate::core::HttpFetcher;
use crate::crawl::CancelToken;
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::query::Selection;
use crate::runner;

const HELP: &str = include_str!("cli_help.txt");

#[derive(Debug, Default)]
pub struct Params {
    pub opts: CrawlOptions,
    pub selection: Selection,
    pub list_filters: bool,
    pub help: bool,
}

/// Flags collected before the config file is known; they overlay it afterwards.
#[derive(Default)]
struct Overrides {
    config: Option<PathBuf>,
    filters_file: Option<PathBuf>,
    filter_flags: Vec<String>,
    out: Option<PathBuf>,
    workers: Option<usize>,
    max_pages: Option<u32>,
    timeout: Option<u64>,
    retries: Option<u32>,
    pause: Option<u64>,
    base_url: Option<String>,
}

fn value<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Result<String> {
    args.next().ok_or_else(|| Error::config(format!("missing value for {flag}")))
}

fn number<T: std::str::FromStr, I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Result<T> {
    let v = value(args, flag)?;
    v.parse().map_err(|_| Error::config(format!("{flag} expects a number, got '{v}'")))
}

/// Parse arguments (program name excluded). Precedence: defaults < `--config` < flags;
/// `--filter` flags win over `--filters` file entries.
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Params> {
    let mut args = args.into_iter();
    let mut o = Overrides::default();
    let mut params = Params::default();

    while let Some(a) = args.next() {
        match a.as_str() {
            "-c" | "--config" => o.config = Some(PathBuf::from(value(&mut args, &a)?)),
            "-f" | "--filters" => o.filters_file = Some(PathBuf::from(value(&mut args, &a)?)),
            "--filter" => o.filter_flags.push(value(&mut args, &a)?),
            "-o" | "--out" => o.out = Some(PathBuf::from(value(&mut args, &a)?)),
            "-w" | "--workers" => o.workers = Some(number(&mut args, &a)?),
            "--max-pages" => o.max_pages = Some(number(&mut args, &a)?),
            "--timeout" => o.timeout = Some(number(&mut args, &a)?),
            "--retries" => o.retries = Some(number(&mut args, &a)?),
            "--pause" => o.pause = Some(number(&mut args, &a)?),
            "--base-url" => o.base_url = Some(value(&mut args, &a)?),
            "--list-filters" => params.list_filters = true,
            "-h" | "--help" => params.help = true,
            _ => return Err(Error::config(format!("unknown arg: {a}"))),
        }
    }

    let mut opts = match &o.config {
        Some(path) => CrawlOptions::from_file(path)?,
        None => CrawlOptions::default(),
    };
    if let Some(v) = o.out { opts.out = v; }
    if let Some(v) = o.workers { opts.workers = v; }
    if let Some(v) = o.max_pages { opts.max_pages = Some(v); }
    if let Some(v) = o.timeout { opts.timeout_secs = v; }
    if let Some(v) = o.retries { opts.retry.max_retries = v; }
    if let Some(v) = o.pause { opts.request_pause_ms = v; }
    if let Some(v) = o.base_url { opts.base_url = v; }
    opts.validate()?;

    let mut selection = match &o.filters_file {
        Some(path) => Selection::from_json(&fs::read_to_string(path)?)?,
        None => Selection::new(),
    };
    for flag in &o.filter_flags {
        selection.parse_flag(flag)?;
    }

    params.opts = opts;
    params.selection = selection;
    Ok(params)
}

/// Prints line-level progress to stderr.
struct ConsoleProgress {
    lines: usize,
}

impl Progress for ConsoleProgress {
    fn begin(&mut self, lines: usize) {
        self.lines = lines;
    }
    fn log(&mut self, msg: &str) {
        eprintln!("{msg}");
    }
    fn line_done(&mut self, index: usize, records: usize) {
        eprintln!("[{}/{}] {records} record(s)", index + 1, self.lines);
    }
    fn line_failed(&mut self, index: usize, page: u32, error: &str) {
        eprintln!("[{}/{}] aborted on page {page}: {error}", index + 1, self.lines);
    }
}

pub fn run() -> Result<()> {
    let params = parse_args(env::args().skip(1))?;
    if params.help {
        eprintln!("{HELP}");
        return Ok(());
    }

    let fetcher = HttpFetcher::new(&params.opts)?;

    if params.list_filters {
        let catalog = runner::list_filters(&params.opts, &fetcher)?;
        for f in catalog.filters() {
            println!("{f}");
        }
        return Ok(());
    }

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || on_signal.cancel()) {
        logw!(error = %e, "could not install Ctrl-C handler");
    }

    let mut progress = ConsoleProgress { lines: 0 };
    let summary = runner::run(&params.opts, &params.selection, &fetcher, &mut progress, &cancel)?;
    if summary.cancelled {
        eprintln!("Cancelled; partial results kept.");
    }
    if !summary.aborted.is_empty() {
        eprintln!("{} line(s) aborted after retries, see .store/debug.log", summary.aborted.len());
    }
    println!("{}", summary.out.display());
    Ok(())
}
