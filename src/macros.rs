// src/macros.rs
#[macro_export]
macro_rules! s {
    // String shorthand!

    // Zero-arg → String::new()
    () => {
        ::std::string::String::new()
    };
    // Any single expression: literals, consts, or vars
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}

/// Selection literal, filter label on the left:
///
/// ```
/// let sel = flat_scrape::selection! {
///     "Umeblowane"   => "Tak",
///     "Liczba pokoi" => ["2 pokoje", "3 pokoje"],
///     "Dzielnica"    => ["Wola", "Mokotów"],
/// };
/// assert_eq!(sel.len(), 3);
/// ```
#[macro_export]
macro_rules! selection {
    () => {
        $crate::query::Selection::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut sel = $crate::query::Selection::new();
        $(
            sel.set($name, $crate::query::SelectionValue::from($value));
        )+
        sel
    }};
}
