// src/sites/mod.rs
//! Per-site extractors. Each variant pulls raw field text out of its own markup
//! and leaves normalization to `normalize`. Fields a site doesn't publish come
//! back `Absent`, never guessed.

pub mod olx;
pub mod otodom;

use scraper::{ElementRef, Html};
use url::Url;

use crate::error::{Error, Result};
use crate::normalize::Field;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Site {
    Olx,
    Otodom,
}

/// Raw listing-summary fields, as they appear on a results page.
#[derive(Debug)]
pub struct ListingFields {
    /// Absolute detail URL, fragment stripped.
    pub link: Field<Url>,
    pub ad_type: Field<String>,
    pub promoted: Field<bool>,
    pub date: Field<String>,
    pub price: Field<String>,
    pub title: Field<String>,
}

/// Raw detail-page fields.
#[derive(Debug)]
pub struct DetailFields {
    pub area: Field<String>,
    pub price_meter: Field<String>,
    pub nrooms: Field<String>,
    pub floor: Field<String>,
    pub furniture: Field<String>,
    pub owner: Field<String>,
    pub market: Field<String>,
    pub building_type: Field<String>,
}

impl Site {
    /// Dispatch on a listing's host. Anything we have no extractor for is `UnknownDomain`.
    pub fn from_domain(host: &str) -> Result<Site> {
        match host.trim_start_matches("www.") {
            "olx.pl" | "m.olx.pl" => Ok(Site::Olx),
            "otodom.pl" => Ok(Site::Otodom),
            _ => Err(Error::UnknownDomain(host.to_string())),
        }
    }

    pub fn from_url(url: &Url) -> Result<Site> {
        Site::from_domain(url.host_str().unwrap_or_default())
    }

    pub fn domain(&self) -> &'static str {
        match self {
            Site::Olx => "www.olx.pl",
            Site::Otodom => "www.otodom.pl",
        }
    }

    pub fn listing_fragments<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            Site::Olx => olx::listing_fragments(doc),
            Site::Otodom => otodom::listing_fragments(doc),
        }
    }

    /// `page_url` resolves relative links.
    pub fn extract_listing_fields(&self, fragment: ElementRef<'_>, page_url: &Url) -> ListingFields {
        match self {
            Site::Olx => olx::listing_fields(fragment, page_url),
            Site::Otodom => otodom::listing_fields(fragment, page_url),
        }
    }

    /// Fails as a whole only when the page has no offer wrapper at all.
    pub fn extract_detail_fields(&self, doc: &Html) -> Result<DetailFields> {
        match self {
            Site::Olx => olx::detail_fields(doc),
            Site::Otodom => otodom::detail_fields(doc),
        }
    }
}

/// Resolve `href` against the page and drop tracking fragments.
pub(crate) fn resolve_link(page_url: &Url, href: Option<&str>) -> Field<Url> {
    let Some(href) = href else {
        return Field::Failed(Error::extraction("listing link not found"));
    };
    match page_url.join(href) {
        Ok(mut url) => {
            url.set_fragment(None);
            Field::Value(url)
        }
        Err(e) => Field::Failed(Error::extraction(format!("bad listing link '{href}': {e}"))),
    }
}

pub(crate) fn required(value: Option<String>, what: &str) -> Field<String> {
    match value {
        Some(v) if !v.is_empty() => Field::Value(v),
        _ => Field::Failed(Error::extraction(format!("{what} not found"))),
    }
}
