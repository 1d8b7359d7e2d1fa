// tests/crawl_termination.rs
//
// Pagination and line outcomes over a scripted transport.
//
mod common;

use chrono::NaiveDate;
use flat_scrape::config::RetryPolicy;
use flat_scrape::crawl::{CancelToken, Crawler, LineOutcome};
use flat_scrape::progress::NullProgress;
use flat_scrape::query::compile;
use flat_scrape::selection;
use url::Url;

use common::*;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
}

/// Two listings per page for pages 1..=last, then the redirect sentinel.
fn site_with_pages(last: u32) -> impl Fn(&Url) -> flat_scrape::Result<flat_scrape::core::Response> + Send + Sync {
    move |url: &Url| {
        if !is_search(url) {
            return ok(url, OLX_DETAIL);
        }
        match page_of(url) {
            Some(p) if p <= last => {
                let district = param(url, "search[district_id]").unwrap_or_default();
                let a = format!("/d/oferta/{district}-p{p}-a.html");
                let b = format!("/d/oferta/{district}-p{p}-b.html");
                ok(url, results_page(&[&a, &b]))
            }
            _ => redirect_to_base(),
        }
    }
}

#[test]
fn stops_at_redirect_and_requests_sentinel_page_once() {
    let cat = catalog();
    let queries = compile(&cat, &selection! { "Dzielnica" => "Wola" }).unwrap();
    let fetcher = Scripted::new(site_with_pages(3));
    let retry = RetryPolicy::immediate(2);
    let cancel = CancelToken::new();
    let crawler = Crawler { fetcher: &fetcher, catalog: &cat, retry: &retry, max_pages: None, cancel: &cancel, today: today() };

    let reports = crawler.crawl_all(&queries, 1, &mut NullProgress).unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, LineOutcome::Completed { pages: 3 });
    assert_eq!(reports[0].records.len(), 6);
    assert_eq!(fetcher.page_hits(4), 1);
    assert_eq!(fetcher.page_hits(5), 0);
    // 4 results pages + 6 detail pages
    assert_eq!(fetcher.total(), 10);
}

#[test]
fn records_carry_normalized_fields() {
    let cat = catalog();
    let queries = compile(&cat, &selection! { "Dzielnica" => "Wola" }).unwrap();
    let fetcher = Scripted::new(site_with_pages(1));
    let retry = RetryPolicy::immediate(0);
    let cancel = CancelToken::new();
    let crawler = Crawler { fetcher: &fetcher, catalog: &cat, retry: &retry, max_pages: None, cancel: &cancel, today: today() };

    let reports = crawler.crawl_all(&queries, 1, &mut NullProgress).unwrap();
    let rec = &reports[0].records[0];
    assert_eq!(rec.link.as_deref(), Some("https://www.olx.pl/d/oferta/359-p1-a.html"));
    assert_eq!(rec.domain.as_deref(), Some("www.olx.pl"));
    assert_eq!(rec.date, Some(today()));
    assert_eq!(rec.price, Some(480_000.0));
    assert_eq!(rec.area, Some(50.0));
    assert_eq!(rec.furniture, Some(true));
    assert_eq!(rec.floor.as_deref(), Some("3"));
}

#[test]
fn district_lines_run_independently_and_report_in_order() {
    let cat = catalog();
    let queries = compile(&cat, &selection! { "Dzielnica" => ["Wola", "Mokotów", "Ochota"] }).unwrap();
    let fetcher = Scripted::new(site_with_pages(2));
    let retry = RetryPolicy::immediate(0);
    let cancel = CancelToken::new();
    let crawler = Crawler { fetcher: &fetcher, catalog: &cat, retry: &retry, max_pages: None, cancel: &cancel, today: today() };

    let reports = crawler.crawl_all(&queries, 3, &mut NullProgress).unwrap();

    assert_eq!(reports.iter().map(|r| r.index).collect::<Vec<_>>(), [0, 1, 2]);
    for r in &reports {
        assert_eq!(r.outcome, LineOutcome::Completed { pages: 2 });
        assert_eq!(r.records.len(), 4);
    }
    assert!(reports[1].records[0].link.as_deref().unwrap().contains("/353-p1-"));
}

#[test]
fn empty_page_ends_line_without_counting_it() {
    let cat = catalog();
    let queries = compile(&cat, &selection! { "Dzielnica" => "Wola" }).unwrap();
    let healthy = site_with_pages(2);
    // No redirect: page 3 answers with an empty result table
    let fetcher = Scripted::new(move |url: &Url| {
        if is_search(url) && page_of(url) == Some(3) {
            return ok(url, results_page(&[]));
        }
        healthy(url)
    });
    let retry = RetryPolicy::immediate(0);
    let cancel = CancelToken::new();
    let crawler = Crawler { fetcher: &fetcher, catalog: &cat, retry: &retry, max_pages: None, cancel: &cancel, today: today() };

    let reports = crawler.crawl_all(&queries, 1, &mut NullProgress).unwrap();
    assert_eq!(reports[0].outcome, LineOutcome::Completed { pages: 2 });
    assert_eq!(reports[0].records.len(), 4);
    assert_eq!(fetcher.page_hits(4), 0);
}

#[test]
fn page_cap_ends_line_early() {
    let cat = catalog();
    let queries = compile(&cat, &selection! { "Dzielnica" => "Wola" }).unwrap();
    let fetcher = Scripted::new(site_with_pages(10));
    let retry = RetryPolicy::immediate(0);
    let cancel = CancelToken::new();
    let crawler = Crawler { fetcher: &fetcher, catalog: &cat, retry: &retry, max_pages: Some(2), cancel: &cancel, today: today() };

    let reports = crawler.crawl_all(&queries, 1, &mut NullProgress).unwrap();
    assert_eq!(reports[0].outcome, LineOutcome::PageCap { pages: 2 });
    assert_eq!(fetcher.page_hits(3), 0);
}

#[test]
fn exhausted_retries_abort_only_that_line() {
    let cat = catalog();
    let queries = compile(&cat, &selection! { "Dzielnica" => ["Wola", "Mokotów"] }).unwrap();
    let healthy = site_with_pages(2);
    // Wola's page 2 never answers
    let fetcher = Scripted::new(move |url: &Url| {
        if is_search(url) && page_of(url) == Some(2) && param(url, "search[district_id]").as_deref() == Some("359") {
            return down(url);
        }
        healthy(url)
    });
    let retry = RetryPolicy::immediate(2);
    let cancel = CancelToken::new();
    let crawler = Crawler { fetcher: &fetcher, catalog: &cat, retry: &retry, max_pages: None, cancel: &cancel, today: today() };

    let reports = crawler.crawl_all(&queries, 1, &mut NullProgress).unwrap();

    assert!(matches!(reports[0].outcome, LineOutcome::Aborted { page: 2, .. }));
    assert_eq!(reports[0].records.len(), 2, "page 1 records survive the abort");
    assert_eq!(reports[1].outcome, LineOutcome::Completed { pages: 2 });
    assert_eq!(reports[1].records.len(), 4);
}

#[test]
fn cancelled_line_keeps_collected_records() {
    let cat = catalog();
    let queries = compile(&cat, &selection! { "Dzielnica" => "Wola" }).unwrap();
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    let healthy = site_with_pages(5);
    // Cancel once the first detail page of page 2 is served
    let fetcher = Scripted::new(move |url: &Url| {
        if url.path().contains("-p2-a") {
            trip.cancel();
        }
        healthy(url)
    });
    let retry = RetryPolicy::immediate(0);
    let crawler = Crawler { fetcher: &fetcher, catalog: &cat, retry: &retry, max_pages: None, cancel: &cancel, today: today() };

    let reports = crawler.crawl_all(&queries, 1, &mut NullProgress).unwrap();

    assert_eq!(reports[0].outcome, LineOutcome::Cancelled { page: 2 });
    assert_eq!(reports[0].records.len(), 3);
    assert_eq!(fetcher.page_hits(3), 0);
}
