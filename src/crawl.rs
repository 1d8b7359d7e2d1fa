// src/crawl.rs
//! Crawl controller: one paginated walk per compiled query line.
//!
//! The target has no "last page" marker. Asking for a page past the end redirects
//! back to the bare search URL, so a line ends when the *resolved* URL of a page
//! request is the base URL (optionally carrying only the page parameter).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;

use chrono::NaiveDate;
use scraper::Html;
use url::Url;

use crate::catalog::FilterCatalog;
use crate::config::RetryPolicy;
use crate::core::net::{Fetcher, get_with_retry};
use crate::error::Result;
use crate::progress::Progress;
use crate::query::CompiledQuery;
use crate::record::{self, NormalizedRecord};
use crate::sites::{DetailFields, ListingFields, Site};

/// Cooperative stop flag, checked between pages and between listings.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }
    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst) }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

/// True when `resolved` is the base search URL, bare or with nothing but a page number.
pub fn is_boundary(base: &Url, resolved: &Url, page_key: &str) -> bool {
    if base.host_str() != resolved.host_str()
        || base.path().trim_end_matches('/') != resolved.path().trim_end_matches('/')
    {
        return false;
    }
    let non_page = |u: &Url| {
        let mut pairs: Vec<(String, String)> = u
            .query_pairs()
            .filter(|(k, _)| k != page_key)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.sort();
        pairs
    };
    non_page(base) == non_page(resolved)
}

/// Position of one line's walk. Pages count from 1 and only move forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrawlCursor {
    page: u32,
    terminated: bool,
}

impl Default for CrawlCursor {
    fn default() -> Self { Self { page: 1, terminated: false } }
}

impl CrawlCursor {
    pub fn page(&self) -> u32 { self.page }
    pub fn is_terminated(&self) -> bool { self.terminated }

    /// URL of the current page, or `None` once terminated.
    pub fn next_url(&self, query: &CompiledQuery, base: &Url, page_key: &str) -> Option<Url> {
        (!self.terminated).then(|| query.page_url(base, page_key, self.page))
    }

    pub fn advance(&mut self) {
        if !self.terminated {
            self.page += 1;
        }
    }

    pub fn terminate(&mut self) {
        self.terminated = true;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// Ran into the redirect sentinel (or an empty page) after `pages` pages with results.
    Completed { pages: u32 },
    PageCap { pages: u32 },
    Cancelled { page: u32 },
    /// Retries exhausted on `page`; the rest of the line was skipped.
    Aborted { page: u32, error: String },
}

#[derive(Debug)]
pub struct LineReport {
    pub index: usize,
    pub label: String,
    pub records: Vec<NormalizedRecord>,
    pub outcome: LineOutcome,
}

pub struct Crawler<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub catalog: &'a FilterCatalog,
    pub retry: &'a RetryPolicy,
    pub max_pages: Option<u32>,
    pub cancel: &'a CancelToken,
    /// Anchor for relative listing dates; fixed for the whole session.
    pub today: NaiveDate,
}

impl Crawler<'_> {
    /// Crawl every line on up to `workers` threads. Reports come back in line order.
    pub fn crawl_all(
        &self,
        queries: &[CompiledQuery],
        workers: usize,
        progress: &mut dyn Progress,
    ) -> Result<Vec<LineReport>> {
        let site = Site::from_url(self.catalog.base_url())?;
        let workers = workers.clamp(1, queries.len().max(1));
        progress.begin(queries.len());

        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<LineReport>();
        let mut reports = Vec::with_capacity(queries.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || {
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        if i >= queries.len() {
                            break;
                        }
                        let _ = tx.send(self.crawl_line(site, i, &queries[i]));
                    }
                });
            }
            drop(tx); // aggregator is the sole receiver now

            for report in rx {
                match &report.outcome {
                    LineOutcome::Aborted { page, error } => progress.line_failed(report.index, *page, error),
                    _ => progress.line_done(report.index, report.records.len()),
                }
                reports.push(report);
            }
        });

        progress.finish();
        reports.sort_by_key(|r| r.index);
        Ok(reports)
    }

    /// Walk one line until the sentinel, the page cap, a cancel or an exhausted retry budget.
    pub fn crawl_line(&self, site: Site, index: usize, query: &CompiledQuery) -> LineReport {
        let label = query.label();
        let _line = tracing::info_span!("line", index, query = %label).entered();

        let mut records = Vec::new();
        let outcome = self.walk(site, query, &mut records);
        match &outcome {
            LineOutcome::Aborted { page, error } => loge!(page, error = %error, "line aborted"),
            other => logf!(records = records.len(), outcome = ?other, "line finished"),
        }
        LineReport { index, label, records, outcome }
    }

    fn walk(&self, site: Site, query: &CompiledQuery, records: &mut Vec<NormalizedRecord>) -> LineOutcome {
        let base = self.catalog.base_url();
        let page_key = self.catalog.page_key();
        let mut cursor = CrawlCursor::default();

        while let Some(url) = cursor.next_url(query, base, page_key) {
            let page = cursor.page();
            if self.cancel.is_cancelled() {
                return LineOutcome::Cancelled { page };
            }
            if self.max_pages.is_some_and(|max| page > max) {
                return LineOutcome::PageCap { pages: page - 1 };
            }
            let _page = tracing::debug_span!("page", n = page).entered();

            let res = match get_with_retry(self.fetcher, &url, self.retry) {
                Ok(res) => res,
                Err(e) => return LineOutcome::Aborted { page, error: e.to_string() },
            };

            // With no parameters every page URL looks like the base, so only an empty page can end the line
            if !query.is_empty() && is_boundary(base, &res.url, page_key) {
                logd!(resolved = %res.url, "redirected to base search");
                cursor.terminate();
                return LineOutcome::Completed { pages: page - 1 };
            }

            let listings = extract_listings(site, &res.body, &res.url);
            if listings.is_empty() {
                logw!(url = %res.url, "results page without listings");
                cursor.terminate();
                return LineOutcome::Completed { pages: page - 1 };
            }
            logd!(listings = listings.len(), "results page parsed");

            for listing in listings {
                if self.cancel.is_cancelled() {
                    return LineOutcome::Cancelled { page };
                }
                if let Some(rec) = self.process_listing(listing) {
                    records.push(rec);
                }
            }
            cursor.advance();
        }
        LineOutcome::Completed { pages: cursor.page().saturating_sub(1) }
    }

    /// Dispatch on the listing's domain, fetch its detail page and assemble a record.
    /// Unknown domains are skipped; an unreadable detail page still yields the listing fields.
    pub fn process_listing(&self, listing: ListingFields) -> Option<NormalizedRecord> {
        let detail = match listing.link.value() {
            None => None,
            Some(link) => match Site::from_url(link) {
                Err(e) => {
                    logw!(link = %link, error = %e, "listing skipped");
                    return None;
                }
                Ok(site) => self.fetch_detail(site, link),
            },
        };
        Some(record::assemble(listing, detail, self.today))
    }

    fn fetch_detail(&self, site: Site, link: &Url) -> Option<DetailFields> {
        let res = match get_with_retry(self.fetcher, link, self.retry) {
            Ok(res) => res,
            Err(e) => {
                logw!(link = %link, error = %e, "detail page unavailable, keeping listing fields");
                return None;
            }
        };
        // OLX forwards partner ads to the partner's own page
        let site = Site::from_url(&res.url).unwrap_or(site);
        let doc = Html::parse_document(&res.body);
        match site.extract_detail_fields(&doc) {
            Ok(fields) => Some(fields),
            Err(e) => {
                logw!(link = %link, error = %e, "detail page unreadable, keeping listing fields");
                None
            }
        }
    }
}

fn extract_listings(site: Site, body: &str, page_url: &Url) -> Vec<ListingFields> {
    let doc = Html::parse_document(body);
    site.listing_fragments(&doc)
        .into_iter()
        .map(|f| site.extract_listing_fields(f, page_url))
        .collect()
}
