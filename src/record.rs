// src/record.rs
//! Record assembly: normalized listing and detail fields merged into one flat record.
//!
//! A field that fails is logged against the listing link and recorded absent. It never
//! takes its siblings, or the record, down with it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::normalize::{self, BuildingType, Field, Market, OwnerType};
use crate::sites::{DetailFields, ListingFields};

/// One output row. Absent fields are left out of the JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_meter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nrooms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub furniture: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<Market>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_type: Option<BuildingType>,
}

/// Merge one listing with its detail page (if that could be read at all).
/// `today` anchors the relative dates on the results page.
pub fn assemble(listing: ListingFields, detail: Option<DetailFields>, today: NaiveDate) -> NormalizedRecord {
    let link = listing.link.value().map(|u| u.to_string());
    let domain = listing.link.value().and_then(|u| u.host_str()).map(str::to_string);
    let ctx = Ctx { link: link.as_deref().unwrap_or("<no link>") };

    let mut rec = NormalizedRecord {
        domain,
        ad_type: ctx.keep("ad_type", listing.ad_type),
        promoted: ctx.keep("promoted", listing.promoted),
        date: ctx.keep("date", listing.date.and_then(|r| normalize::normalize_date(&r, today))),
        price: ctx.keep("price", listing.price.and_then(|r| normalize::normalize_amount(&r))),
        title: ctx.keep("title", listing.title),
        ..NormalizedRecord::default()
    };
    if link.is_none() {
        let _ = ctx.keep("link", listing.link);
    }

    if let Some(d) = detail {
        rec.area = ctx.keep("area", d.area.and_then(|r| normalize::normalize_amount(&r)));
        rec.price_meter = ctx.keep("price_meter", d.price_meter.and_then(|r| normalize::normalize_amount(&r)));
        rec.nrooms = ctx.keep("nrooms", d.nrooms.map(|r| normalize::normalize_rooms(&r)));
        rec.floor = ctx.keep("floor", d.floor.map(|r| normalize::normalize_floor(&r)));
        rec.furniture = ctx.keep_closed("furniture", d.furniture.and_then(|r| normalize::normalize_furnished(&r)));
        rec.owner = ctx.keep("owner", d.owner.map(|r| normalize::normalize_owner(&r)));
        rec.market = ctx.keep_closed("market", d.market.and_then(|r| normalize::normalize_market(&r)));
        rec.building_type = ctx.keep("building_type", d.building_type.map(|r| normalize::normalize_building(&r)));
    }

    rec.link = link;
    rec
}

struct Ctx<'a> {
    link: &'a str,
}

impl Ctx<'_> {
    fn keep<T>(&self, field: &str, value: Field<T>) -> Option<T> {
        self.settle(field, value, false)
    }

    /// Closed vocabularies: an unmapped value means the site changed under us.
    fn keep_closed<T>(&self, field: &str, value: Field<T>) -> Option<T> {
        self.settle(field, value, true)
    }

    fn settle<T>(&self, field: &str, value: Field<T>, closed: bool) -> Option<T> {
        match value {
            Field::Value(v) => Some(v),
            Field::Absent => None,
            Field::Failed(e @ Error::Parse(_)) if closed => {
                loge!(field, link = self.link, error = %e, "closed field failed to normalize");
                None
            }
            Field::Failed(e) => {
                logw!(field, link = self.link, error = %e, "field recorded absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn listing() -> ListingFields {
        ListingFields {
            link: Field::Value(Url::parse("https://www.olx.pl/d/oferta/mieszkanie-ID1.html").unwrap()),
            ad_type: Field::Value(s!("internal")),
            promoted: Field::Value(false),
            date: Field::Value(s!("15  sty")),
            price: Field::Value(s!("520 000 zł")),
            title: Field::Value(s!("2 pokoje Wola")),
        }
    }

    fn detail() -> DetailFields {
        DetailFields {
            area: Field::Value(s!("50 m²")),
            price_meter: Field::Value(s!("10 400 zł/m²")),
            nrooms: Field::Value(s!("2 pokoje")),
            floor: Field::Value(s!("Parter")),
            furniture: Field::Value(s!("Częściowo")),
            owner: Field::Value(s!("Osoby prywatnej")),
            market: Field::Value(s!("Wtórny")),
            building_type: Field::Failed(Error::extraction("parameter 'Rodzaj zabudowy' not found")),
        }
    }

    #[test]
    fn merges_listing_and_detail() {
        let rec = assemble(listing(), Some(detail()), today());
        assert_eq!(rec.domain.as_deref(), Some("www.olx.pl"));
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(rec.price, Some(520_000.0));
        assert_eq!(rec.area, Some(50.0));
        assert_eq!(rec.price_meter, Some(10_400.0));
        assert_eq!(rec.nrooms.as_deref(), Some("2"));
        assert_eq!(rec.floor.as_deref(), Some("0"));
        assert_eq!(rec.owner, Some(OwnerType::Private));
        assert_eq!(rec.market, Some(Market::Secondary));
    }

    #[test]
    fn failed_fields_become_absent() {
        let rec = assemble(listing(), Some(detail()), today());
        assert_eq!(rec.furniture, None);
        assert_eq!(rec.building_type, None);
        assert_eq!(rec.title.as_deref(), Some("2 pokoje Wola"));
    }

    #[test]
    fn listing_only_record_omits_detail_keys() {
        let rec = assemble(listing(), None, today());
        let json = serde_json::to_value(&rec).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("link"));
        assert!(obj.contains_key("price"));
        assert!(!obj.contains_key("area"));
        assert!(!obj.contains_key("market"));
    }
}
