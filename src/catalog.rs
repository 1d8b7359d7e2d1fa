// src/catalog.rs
//! Filter catalog: the search dimensions the target exposes, scraped from its own
//! search page.
//!
//! The site's filter panel gives us labels and parameter keys. A handful of closed
//! vocabularies (building type, market, floor, furnished, rooms) are not spelled out
//! in the panel markup and are overlaid from fixed tables. District and owner are
//! open sets, so their label→code maps are scraped from the page links.
//!
//! The catalog is loaded once per session with [`load`] and passed explicitly to
//! the compiler; nothing downstream mutates it.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::Serialize;
use url::Url;

use crate::config::RetryPolicy;
use crate::core::html::{attr, css, first, first_text, first_text_node, text_of};
use crate::core::net::{Fetcher, get_with_retry};
use crate::core::sanitize::{filter_label, fold};
use crate::error::{Error, Result};

/// Placeholder in a parameter key template for positional multi-value encoding.
pub const ORDINAL: &str = "{ordinal}";

pub const DISTRICT: &str = "Dzielnica";
pub const OWNER: &str = "Właściciel";
pub const PHOTO_ONLY: &str = "Tylko ze zdjęciem";
pub const NEWEST_FIRST: &str = "Sortuj: Najnowsze";
pub const PAGE: &str = "Strona";

const ORDER_KEY: &str = "search[order]";
const ORDER_NEWEST: &str = "created_at:desc";
const PAGE_KEY: &str = "page";

static SEARCH_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"search\[.+\]").expect("static regex"));

/// Closed vocabularies the filter panel doesn't carry in its markup.
const FIXED_VOCABULARIES: &[(&str, &[(&str, &str)])] = &[
    ("Rodzaj zabudowy", &[
        ("Blok", "blok"),
        ("Kamienica", "kamienica"),
        ("Apartamentowiec", "apartamentowiec"),
        ("Loft", "loft"),
        ("Pozostałe", "pozostale"),
    ]),
    ("Rynek", &[("Pierwotny", "primary"), ("Wtórny", "secondary")]),
    ("Poziom", &[
        ("Suterena", "floor_-1"),
        ("Parter", "floor_0"),
        ("1", "floor_1"),
        ("2", "floor_2"),
        ("3", "floor_3"),
        ("4", "floor_4"),
        ("5", "floor_5"),
        ("6", "floor_6"),
        ("7", "floor_7"),
        ("8", "floor_8"),
        ("9", "floor_9"),
        ("10", "floor_10"),
        ("Powyżej 10", "floor_11"),
        ("Poddasze", "floor_17"),
    ]),
    ("Umeblowane", &[("Tak", "yes"), ("Nie", "no")]),
    ("Liczba pokoi", &[
        ("1 pokój", "one"),
        ("2 pokoje", "two"),
        ("3 pokoje", "three"),
        ("4 i więcej", "four"),
    ]),
];

/// Selection words accepted for a [`Vocabulary::Fixed`] toggle.
const ON_WORDS: &[&str] = &["on", "tak", "yes", "true", "1"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Vocabulary {
    /// No value map: the selection text goes on the wire as-is.
    Open,
    /// Human label → wire code, in page order.
    Closed(Vec<(String, String)>),
    /// Toggle with a single wire value. Only an "on" word or the wire value itself
    /// switches it on; to leave it off, select nothing.
    Fixed(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilterDefinition {
    pub name: String,
    /// May contain [`ORDINAL`] for positional multi-value encoding.
    pub param_key: String,
    pub vocabulary: Vocabulary,
    /// Only district may expand one selection into several crawl lines.
    pub is_multi_line: bool,
}

impl FilterDefinition {
    fn open(name: impl Into<String>, param_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_key: param_key.into(),
            vocabulary: Vocabulary::Open,
            is_multi_line: false,
        }
    }

    pub fn is_positional(&self) -> bool {
        self.param_key.contains(ORDINAL)
    }

    /// Concrete key for the value at `ordinal`; keys without a placeholder are returned as-is.
    pub fn key_for(&self, ordinal: usize) -> String {
        self.param_key.replace(ORDINAL, &ordinal.to_string())
    }

    /// Translate one human value into its wire code.
    pub fn encode(&self, value: &str) -> Result<String> {
        match &self.vocabulary {
            Vocabulary::Open => Ok(value.to_string()),
            Vocabulary::Fixed(code) if value == code || ON_WORDS.contains(&fold(value).as_str()) => Ok(code.clone()),
            Vocabulary::Fixed(_) => Err(Error::config(format!(
                "'{value}' does not switch on filter '{}' (use one of: {}; omit it to leave it off)",
                self.name,
                ON_WORDS.join(", ")
            ))),
            Vocabulary::Closed(pairs) => {
                let exact = pairs.iter().find(|(label, _)| label == value);
                let folded = || {
                    let key = fold(value);
                    pairs.iter().find(|(label, _)| fold(label) == key)
                };
                exact
                    .or_else(folded)
                    .map(|(_, code)| code.clone())
                    .ok_or_else(|| {
                        Error::config(format!(
                            "'{value}' is not a known value of filter '{}' (expected one of: {})",
                            self.name,
                            pairs.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>().join(", ")
                        ))
                    })
            }
        }
    }
}

impl fmt::Display for FilterDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.param_key)?;
        if self.is_multi_line {
            write!(f, " (one line per value)")?;
        }
        match &self.vocabulary {
            Vocabulary::Open => Ok(()),
            Vocabulary::Fixed(code) => write!(f, " = {code}"),
            Vocabulary::Closed(pairs) => {
                let labels: Vec<&str> = pairs.iter().map(|(l, _)| l.as_str()).collect();
                write!(f, ": {}", labels.join(" | "))
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct FilterCatalog {
    base_url: Url,
    filters: Vec<FilterDefinition>,
}

impl FilterCatalog {
    pub fn base_url(&self) -> &Url { &self.base_url }
    pub fn filters(&self) -> &[FilterDefinition] { &self.filters }
    pub fn len(&self) -> usize { self.filters.len() }
    pub fn is_empty(&self) -> bool { self.filters.is_empty() }

    pub fn get(&self, name: &str) -> Option<&FilterDefinition> {
        self.filters.iter().find(|f| f.name == name)
    }

    /// The one multi-line dimension (district).
    pub fn multi_line(&self) -> Option<&FilterDefinition> {
        self.filters.iter().find(|f| f.is_multi_line)
    }

    /// Wire key the crawl controller uses for the page number.
    pub fn page_key(&self) -> &str {
        self.get(PAGE).map_or(PAGE_KEY, |f| f.param_key.as_str())
    }
}

/// Fetch the search page once and build the catalog from it.
pub fn load(fetcher: &dyn Fetcher, base_url: &Url, retry: &RetryPolicy) -> Result<FilterCatalog> {
    logf!(url = %base_url, "loading filter catalog");
    let page = get_with_retry(fetcher, base_url, retry)?;
    let catalog = parse(&page.body, base_url)?;
    logf!(filters = catalog.len(), "filter catalog loaded");
    for f in catalog.filters() {
        logd!("filter: {f}");
    }
    Ok(catalog)
}

/// Build the catalog from search-page HTML. Any missing widget is fatal:
/// a partial catalog would silently compile wrong queries.
pub fn parse(html: &str, base_url: &Url) -> Result<FilterCatalog> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let mut filters = parse_panel(root)?;
    overlay_vocabularies(&mut filters)?;
    filters.push(parse_districts(root, base_url)?);
    filters.push(parse_owner(root, base_url)?);
    filters.push(parse_photo_only(root)?);
    filters.push(FilterDefinition {
        vocabulary: Vocabulary::Fixed(s!(ORDER_NEWEST)),
        ..FilterDefinition::open(NEWEST_FIRST, ORDER_KEY)
    });
    filters.push(FilterDefinition::open(PAGE, PAGE_KEY));

    Ok(FilterCatalog { base_url: base_url.clone(), filters })
}

/* ---------- panel widgets ---------- */

fn parse_panel(root: ElementRef<'_>) -> Result<Vec<FilterDefinition>> {
    let panel = first(root, css!(".multifilters"))
        .ok_or_else(|| Error::config("search page has no filter panel (.multifilters)"))?;

    let mut out = Vec::new();
    for widget in panel.select(css!(".param.paramSelect, .param.paramFloat")) {
        let Some(headline) = first_text(widget, css!("div.filter-headline")).map(|h| filter_label(&h)) else {
            logw!("filter widget without a headline, skipped");
            continue;
        };

        if first(widget, css!("div.filter-both-item")).is_some() {
            // Range widget: one filter per bound, keyed by the input's search[...] class
            for item in widget.select(css!("div.filter-item")) {
                let bound = first_text(item, css!("span.header.block")).unwrap_or_default();
                let key = first(item, css!("input.defaultval"))
                    .and_then(|input| input.value().classes().find_map(search_key));
                match key {
                    Some(key) => out.push(FilterDefinition::open(filter_label(&format!("{headline} {bound}")), key)),
                    None => logw!(filter = %headline, bound = %bound, "range bound without a search key, skipped"),
                }
            }
        } else {
            let Some(code) = attr(widget, "data-name") else {
                logw!(filter = %headline, "filter widget without data-name, skipped");
                continue;
            };
            out.push(FilterDefinition::open(headline, code.replace("[]", &format!("[{ORDINAL}]"))));
        }
    }
    Ok(out)
}

fn search_key(text: &str) -> Option<String> {
    SEARCH_KEY.find(text).map(|m| m.as_str().to_string())
}

fn overlay_vocabularies(filters: &mut [FilterDefinition]) -> Result<()> {
    for (name, table) in FIXED_VOCABULARIES {
        let def = filters
            .iter_mut()
            .find(|f| f.name == *name)
            .ok_or_else(|| Error::config(format!("expected filter '{name}' missing from search page")))?;
        def.vocabulary = Vocabulary::Closed(
            table.iter().map(|(label, code)| (s!(*label), s!(*code))).collect(),
        );
    }
    Ok(())
}

/* ---------- scraped open vocabularies ---------- */

/// First `search[...]` query parameter of a link, decoded.
fn link_param(base: &Url, href: &str, want: impl Fn(&str) -> bool) -> Option<(String, String)> {
    let url = base.join(href).ok()?;
    url.query_pairs()
        .find(|(k, _)| want(&**k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
}

fn parse_districts(root: ElementRef<'_>, base: &Url) -> Result<FilterDefinition> {
    let mut key: Option<String> = None;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for a in root.select(css!(r#"a[href*="district_id"]"#)) {
        let label = text_of(a);
        let Some((k, code)) = attr(a, "href").and_then(|h| link_param(base, h, |k| k.contains("district_id"))) else {
            continue;
        };
        if label.is_empty() || pairs.iter().any(|(l, _)| *l == label) {
            continue;
        }
        key.get_or_insert(k);
        pairs.push((label, code));
    }

    let key = key.ok_or_else(|| Error::config("search page has no district links"))?;
    Ok(FilterDefinition {
        vocabulary: Vocabulary::Closed(pairs),
        is_multi_line: true,
        ..FilterDefinition::open(DISTRICT, key)
    })
}

fn parse_owner(root: ElementRef<'_>, base: &Url) -> Result<FilterDefinition> {
    let mut key: Option<String> = None;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for a in root.select(css!("a.topTabOffer")) {
        let Some(label) = first_text_node(a) else { continue };
        // The "all offers" tab carries no owner parameter
        let Some((k, code)) = attr(a, "href").and_then(|h| link_param(base, h, |k| k.starts_with("search["))) else {
            continue;
        };
        key.get_or_insert(k);
        pairs.push((label, code));
    }

    let key = key.ok_or_else(|| Error::config("search page has no owner tabs"))?;
    Ok(FilterDefinition {
        vocabulary: Vocabulary::Closed(pairs),
        ..FilterDefinition::open(OWNER, key)
    })
}

fn parse_photo_only(root: ElementRef<'_>) -> Result<FilterDefinition> {
    let input = first(root, css!("input#photo-only"))
        .ok_or_else(|| Error::config("search page has no photo-only checkbox"))?;
    let name = attr(input, "name").ok_or_else(|| Error::config("photo-only checkbox has no name"))?;
    let value = attr(input, "value").unwrap_or("1");
    Ok(FilterDefinition {
        vocabulary: Vocabulary::Fixed(s!(value)),
        ..FilterDefinition::open(PHOTO_ONLY, name)
    })
}
