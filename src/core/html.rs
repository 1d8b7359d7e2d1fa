// src/core/html.rs
// Small helpers over `scraper` so extractors read like the page they target.

use scraper::{ElementRef, Selector};

use super::sanitize::normalize_ws;

/// Static CSS selector, parsed once on first use.
macro_rules! css {
    ($sel:literal) => {{
        static SEL: ::std::sync::LazyLock<::scraper::Selector> = ::std::sync::LazyLock::new(|| {
            ::scraper::Selector::parse($sel).expect(concat!("static selector: ", $sel))
        });
        &*SEL
    }};
}
pub(crate) use css;

/// All visible text under `el`, whitespace collapsed.
pub fn text_of(el: ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<String>())
}

pub fn first<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    el.select(sel).next()
}

pub fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    first(el, sel).map(text_of)
}

pub fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name)
}

/// First text node directly after `el`, e.g. `<i data-icon="clock"></i>15  sty`.
pub fn next_text_sibling(el: ElementRef<'_>) -> Option<String> {
    el.next_siblings()
        .find_map(|n| n.value().as_text().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
}

pub fn next_element_sibling(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// First non-blank text node under `el`, trimmed.
pub fn first_text_node(el: ElementRef<'_>) -> Option<String> {
    el.text().map(str::trim).find(|t| !t.is_empty()).map(str::to_string)
}
