// src/normalize.rs
//! Raw, locale-specific field text → canonical typed values.
//!
//! Every function here is pure: no I/O, no clock. Date normalization takes `today`
//! from the caller so a crawl evaluates every listing against the same day.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::sanitize::{fold, normalize_ws};
use crate::error::{Error, Result};

/// Outcome of extracting or normalizing one field. Siblings never see each other's failures.
#[derive(Debug)]
pub enum Field<T> {
    Value(T),
    /// The site doesn't expose this field.
    Absent,
    Failed(Error),
}

impl<T> Field<T> {
    pub fn from_result(r: Result<T>) -> Self {
        match r {
            Ok(v) => Field::Value(v),
            Err(e) => Field::Failed(e),
        }
    }

    /// Feed a present value through a fallible step; absent and failed pass through.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U>) -> Field<U> {
        match self {
            Field::Value(v) => Field::from_result(f(v)),
            Field::Absent => Field::Absent,
            Field::Failed(e) => Field::Failed(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        self.and_then(|v| Ok(f(v)))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Field::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Field::Absent, Field::Value)
    }
}

/* ---------- dates ---------- */

// Prefix match, so "stycznia", "paź." and "January" all land.
const MONTHS: &[(&str, u32)] = &[
    ("sty", 1), ("lut", 2), ("mar", 3), ("kwi", 4), ("maj", 5), ("cze", 6),
    ("lip", 7), ("sie", 8), ("wrz", 9), ("paź", 10), ("paz", 10), ("lis", 11), ("gru", 12),
    ("jan", 1), ("feb", 2), ("apr", 4), ("may", 5), ("jun", 6),
    ("jul", 7), ("aug", 8), ("sep", 9), ("oct", 10), ("nov", 11), ("dec", 12),
];

fn month_of(token: &str) -> Option<u32> {
    MONTHS.iter().find(|(abbr, _)| token.starts_with(abbr)).map(|(_, m)| *m)
}

/// `dzisiaj 14:02` → today, `wczoraj 09:10` → yesterday, `15  sty` → 15 January.
///
/// Listings carry no year. A month up to the current one is this year; a later
/// month can only be last year's.
pub fn normalize_date(raw: &str, today: NaiveDate) -> Result<NaiveDate> {
    let text = fold(raw);
    if text.starts_with("dzisiaj") {
        return Ok(today);
    }
    if text.starts_with("wczoraj") {
        return today.pred_opt().ok_or_else(|| Error::parse(format!("no day before {today}")));
    }

    let mut tokens = text.split_whitespace();
    let (Some(day), Some(month)) = (tokens.next(), tokens.next()) else {
        return Err(Error::parse(format!("unrecognized date '{raw}'")));
    };
    let day: u32 = day
        .trim_end_matches('.')
        .parse()
        .map_err(|_| Error::parse(format!("bad day in date '{raw}'")))?;
    let month = month_of(month).ok_or_else(|| Error::parse(format!("unknown month in date '{raw}'")))?;

    let year = if month <= today.month() { today.year() } else { today.year() - 1 };
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| Error::parse(format!("no such date '{raw}' in {year}")))
}

/* ---------- numbers ---------- */

/// One figure: digit groups of three after the first, optional decimal part.
static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{1,3}(?: \d{3})+|\d+)(?:[,.]\d+)?$").expect("static regex"));

/// Price, price per m² or area: `1 234 567 zł` → 1234567.0, `450 000,50` → 450000.5,
/// `10 250 zł/m²` → 10250.0, `48,5 m²` → 48.5.
///
/// Text holding more than one figure (`749 000 zł 12 483 zł/m²`) is a parse error.
pub fn normalize_amount(raw: &str) -> Result<f64> {
    let head = normalize_ws(raw.split('/').next().unwrap_or_default());
    let number = ["zł", "m²", "m2"]
        .iter()
        .find_map(|unit| head.strip_suffix(unit))
        .unwrap_or(head.as_str())
        .trim_end();

    if !number.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::parse(format!("no number in '{}'", normalize_ws(raw))));
    }
    if !AMOUNT.is_match(number) {
        return Err(Error::parse(format!("not a single amount: '{}'", normalize_ws(raw))));
    }
    number
        .replace(' ', "")
        .replace(',', ".")
        .parse()
        .map_err(|_| Error::parse(format!("bad number '{}'", normalize_ws(raw))))
}

/* ---------- enumerations ---------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    Primary,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingType {
    Block,
    Tenement,
    Apartment,
    Loft,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerType {
    Private,
    Business,
    Other,
}

/// `Suterena` → `-1`, `Parter` → `0`, `1`..`10`, `Powyżej 10` → `>10`, `Poddasze` → `attic`.
/// Otodom's `3/10` (floor of total) counts as `3`.
pub fn normalize_floor(raw: &str) -> String {
    let text = fold(raw);
    let text = text.split('/').next().unwrap_or_default().trim();
    match text {
        "suterena" => return s!("-1"),
        "parter" => return s!("0"),
        "poddasze" => return s!("attic"),
        "powyżej 10" | "> 10" | ">10" => return s!(">10"),
        _ => {}
    }
    match text.parse::<i32>() {
        Ok(-1) => s!("-1"),
        Ok(n @ 0..=10) => n.to_string(),
        Ok(n) if n > 10 => s!(">10"),
        _ => s!("Other"),
    }
}

/// `1 pokój`/`2 pokoje`/`3 pokoje` → the digit, `4 i więcej` or any bare number above 3 → `>3`.
pub fn normalize_rooms(raw: &str) -> String {
    let text = fold(raw);
    match text.as_str() {
        "1 pokój" => return s!("1"),
        "2 pokoje" => return s!("2"),
        "3 pokoje" => return s!("3"),
        "4 i więcej" | "więcej niż 10" => return s!(">3"),
        _ => {}
    }
    match text.parse::<u32>() {
        Ok(n @ 1..=3) => n.to_string(),
        Ok(n) if n > 3 => s!(">3"),
        _ => s!("Other"),
    }
}

pub fn normalize_building(raw: &str) -> BuildingType {
    match fold(raw).as_str() {
        "blok" => BuildingType::Block,
        "kamienica" => BuildingType::Tenement,
        "apartamentowiec" => BuildingType::Apartment,
        "loft" => BuildingType::Loft,
        _ => BuildingType::Other,
    }
}

pub fn normalize_owner(raw: &str) -> OwnerType {
    match fold(raw).as_str() {
        "osoby prywatnej" | "prywatne" | "prywatny" => OwnerType::Private,
        "firmy" | "firmowe" | "biuro nieruchomości" | "deweloper" => OwnerType::Business,
        _ => OwnerType::Other,
    }
}

/// Closed list: anything but primary/secondary is a hard failure.
pub fn normalize_market(raw: &str) -> Result<Market> {
    match fold(raw).as_str() {
        "pierwotny" => Ok(Market::Primary),
        "wtórny" | "wtorny" => Ok(Market::Secondary),
        _ => Err(Error::parse(format!("unmapped market '{}'", normalize_ws(raw)))),
    }
}

/// Closed list: `Tak`/`Nie`.
pub fn normalize_furnished(raw: &str) -> Result<bool> {
    match fold(raw).as_str() {
        "tak" | "yes" => Ok(true),
        "nie" | "no" => Ok(false),
        _ => Err(Error::parse(format!("unmapped furnished flag '{}'", normalize_ws(raw)))),
    }
}
