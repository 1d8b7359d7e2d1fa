// src/sites/olx.rs

use scraper::{ElementRef, Html};
use url::Url;

use super::{DetailFields, ListingFields, required, resolve_link};
use crate::core::html::{attr, css, first, first_text, next_element_sibling, next_text_sibling, text_of};
use crate::core::sanitize::fold;
use crate::error::{Error, Result};
use crate::normalize::Field;

pub fn listing_fragments(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.select(css!("table#offers_table tr.wrap")).collect()
}

pub fn listing_fields(row: ElementRef<'_>, page_url: &Url) -> ListingFields {
    let anchor = first(row, css!(r#"a[data-cy="listing-ad-title"]"#));

    // rel="external" marks ads hosted on a partner site
    let ad_type = attr(row, "rel").map(str::trim).filter(|r| !r.is_empty()).unwrap_or("internal");

    ListingFields {
        link: resolve_link(page_url, anchor.and_then(|a| attr(a, "href"))),
        ad_type: Field::Value(ad_type.to_string()),
        promoted: Field::Value(first(row, css!("td.offer.promoted")).is_some()),
        date: required(first(row, css!(r#"i[data-icon="clock"]"#)).and_then(next_text_sibling), "date added"),
        price: required(first_text(row, css!("p.price")), "price"),
        title: required(anchor.map(text_of), "title"),
    }
}

pub fn detail_fields(doc: &Html) -> Result<DetailFields> {
    let wrapper = first(doc.root_element(), css!("div#offerdescription"))
        .ok_or_else(|| Error::extraction("offer description (div#offerdescription) not found"))?;

    Ok(DetailFields {
        area: param(wrapper, "Powierzchnia"),
        price_meter: param(wrapper, "Cena za m²"),
        nrooms: param(wrapper, "Liczba pokoi"),
        floor: param(wrapper, "Poziom"),
        furniture: param(wrapper, "Umeblowane"),
        owner: param(wrapper, "Oferta od"),
        market: param(wrapper, "Rynek"),
        building_type: param(wrapper, "Rodzaj zabudowy"),
    })
}

/// Value next to a parameter label. Newer pages use `span.offer-details__name`,
/// older ones a details table with `<th>` labels.
fn param(wrapper: ElementRef<'_>, label: &str) -> Field<String> {
    let want = fold(label);
    let value = wrapper
        .select(css!("span.offer-details__name, th"))
        .find(|name| fold(&text_of(*name)) == want)
        .and_then(next_element_sibling)
        .map(text_of);
    required(value, &format!("parameter '{label}'"))
}
