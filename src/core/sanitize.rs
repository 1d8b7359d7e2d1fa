// src/core/sanitize.rs

/// Collapse runs of whitespace (NBSP and thin spaces included) into one space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Filter labels as the catalog keys them: whitespace collapsed, `m²` spelled `m2`.
pub fn filter_label(s: &str) -> String {
    normalize_ws(&s.replace('\u{00B2}', "2"))
}

/// Case-folded, whitespace-normalized key for vocabulary lookups.
pub fn fold(s: &str) -> String {
    normalize_ws(s).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nbsp_counts_as_space() {
        assert_eq!(normalize_ws("1\u{a0}234\u{202f}567  zł "), "1 234 567 zł");
    }

    #[test]
    fn squared_becomes_two() {
        assert_eq!(filter_label(" Pow. m²  od"), "Pow. m2 od");
    }

    #[test]
    fn fold_lowercases_polish() {
        assert_eq!(fold("  Wtórny "), "wtórny");
        assert_eq!(fold("POWYŻEJ  10"), "powyżej 10");
    }
}
