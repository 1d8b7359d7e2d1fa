// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use flat_scrape::catalog::{self, FilterCatalog};
use flat_scrape::config::consts::BASE_URL;
use flat_scrape::core::{Fetcher, Response};
use flat_scrape::{Error, Result};
use url::Url;

pub const SEARCH_PAGE: &str = include_str!("../fixtures/search_page.html");

pub fn base() -> Url {
    Url::parse(BASE_URL).unwrap()
}

pub fn catalog() -> FilterCatalog {
    catalog::parse(SEARCH_PAGE, &base()).unwrap()
}

/// In-memory transport: a routing closure decides each response, every request is counted.
pub struct Scripted<F> {
    route: F,
    hits: Mutex<HashMap<String, usize>>,
}

impl<F> Scripted<F>
where
    F: Fn(&Url) -> Result<Response> + Send + Sync,
{
    pub fn new(route: F) -> Self {
        Self { route, hits: Mutex::new(HashMap::new()) }
    }

    pub fn hits(&self, url: &Url) -> usize {
        self.hits.lock().unwrap().get(url.as_str()).copied().unwrap_or(0)
    }

    /// Requests whose query carries `page=<page>`.
    pub fn page_hits(&self, page: u32) -> usize {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| page_of(&Url::parse(u).unwrap()) == Some(page))
            .map(|(_, n)| *n)
            .sum()
    }

    pub fn total(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

impl<F> Fetcher for Scripted<F>
where
    F: Fn(&Url) -> Result<Response> + Send + Sync,
{
    fn get(&self, url: &Url) -> Result<Response> {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
        (self.route)(url)
    }
}

pub fn ok(url: &Url, body: impl Into<String>) -> Result<Response> {
    Ok(Response { url: url.clone(), body: body.into() })
}

/// The site's "past the last page" answer: a redirect back to the bare search URL.
pub fn redirect_to_base() -> Result<Response> {
    Ok(Response { url: base(), body: results_page(&[]) })
}

pub fn down(url: &Url) -> Result<Response> {
    Err(Error::transport(url.as_str(), "connection refused"))
}

pub fn gone(url: &Url) -> Result<Response> {
    Err(Error::http(url.as_str(), 404))
}

pub fn page_of(url: &Url) -> Option<u32> {
    url.query_pairs().find(|(k, _)| k == "page").and_then(|(_, v)| v.parse().ok())
}

pub fn param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
}

pub fn is_search(url: &Url) -> bool {
    url.path() == base().path()
}

/// OLX results table with one row per link.
pub fn results_page(links: &[&str]) -> String {
    let rows: String = links
        .iter()
        .map(|href| {
            format!(
                r#"<tr class="wrap" rel="">
                     <td class="offer ">
                       <a data-cy="listing-ad-title" href="{href}"><strong>Mieszkanie {href}</strong></a>
                       <p class="price"><strong>480 000 zł</strong></p>
                       <small><span><i data-icon="clock"></i>dzisiaj 10:15</span></small>
                     </td>
                   </tr>"#
            )
        })
        .collect();
    format!(r#"<html><body><table id="offers_table"><tbody>{rows}</tbody></table></body></html>"#)
}

pub const OLX_DETAIL: &str = r#"
<html><body>
<div class="offerdescription clr" id="offerdescription">
  <ul class="offer-details">
    <li><span class="offer-details__name">Oferta od</span><strong class="offer-details__value">Osoby prywatnej</strong></li>
    <li><span class="offer-details__name">Cena za m²</span><strong class="offer-details__value">9 600 zł/m²</strong></li>
    <li><span class="offer-details__name">Poziom</span><strong class="offer-details__value">3</strong></li>
    <li><span class="offer-details__name">Umeblowane</span><strong class="offer-details__value">Tak</strong></li>
    <li><span class="offer-details__name">Rynek</span><strong class="offer-details__value">Wtórny</strong></li>
    <li><span class="offer-details__name">Rodzaj zabudowy</span><strong class="offer-details__value">Blok</strong></li>
    <li><span class="offer-details__name">Powierzchnia</span><strong class="offer-details__value">50 m²</strong></li>
    <li><span class="offer-details__name">Liczba pokoi</span><strong class="offer-details__value">2 pokoje</strong></li>
  </ul>
</div>
</body></html>"#;
