// src/sites/otodom.rs
// Otodom doesn't publish furnished, owner or date added in the markup we read.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use super::{DetailFields, ListingFields, required, resolve_link};
use crate::core::html::{attr, css, first, first_text, text_of};
use crate::error::{Error, Result};
use crate::normalize::Field;

static PRICE_PER_METER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+ zł/m").expect("static regex"));

pub fn listing_fragments(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.select(css!("article.offer-item")).collect()
}

pub fn listing_fields(item: ElementRef<'_>, page_url: &Url) -> ListingFields {
    let promoted = item.value().classes().any(|c| c.contains("promoted"));
    ListingFields {
        link: resolve_link(page_url, attr(item, "data-url")),
        ad_type: Field::Value(s!("internal")),
        promoted: Field::Value(promoted),
        date: Field::Absent,
        price: required(first_text(item, css!(".offer-item-price")), "price"),
        title: required(first_text(item, css!(".offer-item-title")), "title"),
    }
}

pub fn detail_fields(doc: &Html) -> Result<DetailFields> {
    let article = first(doc.root_element(), css!("article"))
        .ok_or_else(|| Error::extraction("offer article not found"))?;
    let overview = first(article, css!("section.section-overview"));

    Ok(DetailFields {
        area: param(overview, "Powierzchnia"),
        price_meter: price_per_meter(article),
        nrooms: param(overview, "Liczba pokoi"),
        floor: param(overview, "Piętro"),
        furniture: Field::Absent,
        owner: Field::Absent,
        market: param(overview, "Rynek"),
        building_type: param(overview, "Rodzaj zabudowy"),
    })
}

/// Overview items read `Label: value`.
fn param(overview: Option<ElementRef<'_>>, label: &str) -> Field<String> {
    let Some(overview) = overview else {
        return Field::Failed(Error::extraction("overview section not found"));
    };
    let value = overview
        .select(css!("li"))
        .map(text_of)
        .find(|t| t.contains(label))
        .map(|t| t.replacen(label, "", 1).replace(':', "").trim().to_string());
    required(value, &format!("parameter '{label}'"))
}

/// Innermost `div` mentioning a zł/m² figure; the outer ones repeat it with noise.
fn price_per_meter(article: ElementRef<'_>) -> Field<String> {
    let value = article
        .select(css!("div"))
        .map(text_of)
        .filter(|t| PRICE_PER_METER.is_match(t))
        .last();
    required(value, "price per m²")
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER: &str = r#"
        <article>
          <header><div><div class="price">749 000 zł</div><div class="per-m">12 483 zł/m²</div></div></header>
          <section class="section-overview">
            <ul>
              <li>Powierzchnia: <strong>60 m²</strong></li>
              <li>Liczba pokoi: <strong>3</strong></li>
              <li>Rynek: <strong>pierwotny</strong></li>
              <li>Rodzaj zabudowy: <strong>apartamentowiec</strong></li>
              <li>Piętro: <strong>&gt; 10</strong></li>
            </ul>
          </section>
        </article>"#;

    #[test]
    fn overview_params() {
        let d = detail_fields(&Html::parse_document(OFFER)).unwrap();
        assert_eq!(d.area.value().map(String::as_str), Some("60 m²"));
        assert_eq!(d.nrooms.value().map(String::as_str), Some("3"));
        assert_eq!(d.market.value().map(String::as_str), Some("pierwotny"));
        assert_eq!(d.building_type.value().map(String::as_str), Some("apartamentowiec"));
        assert_eq!(d.floor.value().map(String::as_str), Some("> 10"));
        assert_eq!(d.price_meter.value().map(String::as_str), Some("12 483 zł/m²"));
    }

    #[test]
    fn unpublished_fields_stay_absent() {
        let d = detail_fields(&Html::parse_document(OFFER)).unwrap();
        assert!(d.furniture.is_absent());
        assert!(d.owner.is_absent());
    }

    #[test]
    fn search_results() {
        let doc = Html::parse_document(r#"
            <div class="listing">
              <article class="offer-item ad_promoted" data-url="https://www.otodom.pl/oferta/3-pokoje-ID4a#x">
                <span class="offer-item-title">3 pokoje z widokiem</span>
                <li class="offer-item-price">749 000 zł</li>
              </article>
            </div>"#);
        let page = Url::parse("https://www.otodom.pl/sprzedaz/mieszkanie/warszawa/").unwrap();
        let items = listing_fragments(&doc);
        assert_eq!(items.len(), 1);
        let l = listing_fields(items[0], &page);
        assert_eq!(l.link.value().unwrap().as_str(), "https://www.otodom.pl/oferta/3-pokoje-ID4a");
        assert_eq!(l.promoted.value(), Some(&true));
        assert!(l.date.is_absent());
    }
}
