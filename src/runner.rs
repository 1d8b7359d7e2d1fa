// src/runner.rs
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use url::Url;

use crate::catalog::{self, FilterCatalog};
use crate::config::CrawlOptions;
use crate::core::net::Fetcher;
use crate::crawl::{CancelToken, Crawler, LineOutcome};
use crate::error::Result;
use crate::progress::Progress;
use crate::query::{self, Selection};
use crate::record::NormalizedRecord;
use crate::store;

/// Summary of what was produced.
#[derive(Debug)]
pub struct RunSummary {
    pub lines: usize,
    pub records: usize,
    /// Line indices that gave up on exhausted retries.
    pub aborted: Vec<usize>,
    pub cancelled: bool,
    pub out: PathBuf,
}

/// One crawl session: load the catalog, compile, crawl every line, save.
/// Configuration errors surface before the first results page is requested.
/// Whatever was collected is saved, cancelled or not.
pub fn run(
    opts: &CrawlOptions,
    selection: &Selection,
    fetcher: &dyn Fetcher,
    progress: &mut dyn Progress,
    cancel: &CancelToken,
) -> Result<RunSummary> {
    run_on(opts, selection, fetcher, progress, cancel, Local::now().date_naive())
}

/// [`run`] with an explicit day for relative listing dates.
pub fn run_on(
    opts: &CrawlOptions,
    selection: &Selection,
    fetcher: &dyn Fetcher,
    progress: &mut dyn Progress,
    cancel: &CancelToken,
    today: NaiveDate,
) -> Result<RunSummary> {
    opts.validate()?;
    let catalog = load_catalog(opts, fetcher)?;
    let queries = query::compile(&catalog, selection)?;
    logf!(lines = queries.len(), workers = opts.workers, "queries compiled");
    progress.log(&format!("Crawling {} query line(s)…", queries.len()));

    let crawler = Crawler {
        fetcher,
        catalog: &catalog,
        retry: &opts.retry,
        max_pages: opts.max_pages,
        cancel,
        today,
    };
    let reports = crawler.crawl_all(&queries, opts.workers, progress)?;

    let mut aborted = Vec::new();
    let mut cancelled = false;
    let mut records: Vec<NormalizedRecord> = Vec::new();
    for r in reports {
        match r.outcome {
            LineOutcome::Aborted { .. } => aborted.push(r.index),
            LineOutcome::Cancelled { .. } => cancelled = true,
            _ => {}
        }
        records.extend(r.records);
    }

    store::save_records(&opts.out, &records)?;
    logf!(records = records.len(), out = %opts.out.display(), "records saved");
    progress.log(&format!("Saved {} record(s) to {}", records.len(), opts.out.display()));

    Ok(RunSummary {
        lines: queries.len(),
        records: records.len(),
        aborted,
        cancelled,
        out: opts.out.clone(),
    })
}

/// Catalog for `--list-filters`.
pub fn list_filters(opts: &CrawlOptions, fetcher: &dyn Fetcher) -> Result<FilterCatalog> {
    opts.validate()?;
    load_catalog(opts, fetcher)
}

fn load_catalog(opts: &CrawlOptions, fetcher: &dyn Fetcher) -> Result<FilterCatalog> {
    let base = Url::parse(&opts.base_url)?;
    catalog::load(fetcher, &base, &opts.retry)
}
