//! Canonical display filenames for receipts.
//!
//! A reviewed receipt is named `YYYY_MM_Name`, where `Name` is the
//! restaurant name folded to ASCII and stripped down to letters, digits
//! and underscores. [`make_unique`] then suffixes `_2`, `_3`, ... against
//! a caller-supplied set of names already in use.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Substituted when nothing printable survives sanitization.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Default cap on the sanitized name part.
pub const DEFAULT_NAME_CAP: usize = 30;

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("static regex"))
}

fn separator_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-\s]+").expect("static regex"))
}

/// Reduce free text to a filename-safe ASCII token.
///
/// "Café René" becomes "Cafe_Rene", "Restaurant & Bar!" becomes
/// "Restaurant_Bar". Empty results become [`UNKNOWN_NAME`]. When `cap` is
/// set the result is cut to that many characters; this happens after
/// sanitization so it can never split a multibyte sequence.
pub fn sanitize_name(text: &str, cap: Option<usize>) -> String {
    let ascii: String = text.nfkd().filter(char::is_ascii).collect();
    let stripped = disallowed_chars().replace_all(&ascii, "");
    let joined = separator_runs().replace_all(&stripped, "_");
    let mut name = joined.trim_matches('_').to_string();

    if let Some(cap) = cap {
        if name.len() > cap {
            name.truncate(cap);
            name = name.trim_end_matches('_').to_string();
        }
    }

    if name.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        name
    }
}

/// `YYYY_MM_Name` from an ISO date and a restaurant name. `None` when either
/// input is missing/blank or the date is not `YYYY-MM-DD`.
pub fn canonicalize(
    date: Option<&str>,
    name: Option<&str>,
    cap: Option<usize>,
) -> Option<String> {
    let date = date.map(str::trim).filter(|d| !d.is_empty())?;
    let name = name.filter(|n| !n.trim().is_empty())?;
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(format!(
        "{:04}_{:02}_{}",
        parsed.year(),
        parsed.month(),
        sanitize_name(name, cap)
    ))
}

/// `YYYY_MM` folder key for an ISO date.
pub fn year_month(date: &str) -> Option<String> {
    let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    Some(format!("{:04}_{:02}", parsed.year(), parsed.month()))
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Return `candidate` unchanged if it is not in `taken`, otherwise the
/// first of `stem_2.ext`, `stem_3.ext`, ... that is free.
///
/// The search walks integers upward, so the result depends only on the
/// contents of `taken`, never on its iteration order. Which names belong in
/// `taken` is the caller's decision and must be stated at the call site.
pub fn make_unique(candidate: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(candidate) {
        return candidate.to_string();
    }
    let (stem, ext) = split_extension(candidate);
    let mut n: u32 = 2;
    loop {
        let attempt = format!("{stem}_{n}{ext}");
        if !taken.contains(&attempt) {
            return attempt;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(date: Option<&str>, name: Option<&str>) -> Option<String> {
        canonicalize(date, name, Some(DEFAULT_NAME_CAP))
    }

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_accents_are_folded() {
        assert_eq!(
            canon(Some("2025-10-15"), Some("Café René")).as_deref(),
            Some("2025_10_Cafe_Rene")
        );
    }

    #[test]
    fn test_punctuation_is_stripped() {
        assert_eq!(
            canon(Some("2025-10-15"), Some("Restaurant & Bar!")).as_deref(),
            Some("2025_10_Restaurant_Bar")
        );
    }

    #[test]
    fn test_missing_inputs_yield_none() {
        assert_eq!(canon(None, Some("Anything")), None);
        assert_eq!(canon(Some("2025-10-15"), None), None);
        assert_eq!(canon(Some(""), Some("Anything")), None);
        assert_eq!(canon(Some("2025-10-15"), Some("   ")), None);
    }

    #[test]
    fn test_bad_date_yields_none() {
        assert_eq!(canon(Some("15/10/2025"), Some("Cafe")), None);
        assert_eq!(canon(Some("2025-13-01"), Some("Cafe")), None);
        assert_eq!(canon(Some("yesterday"), Some("Cafe")), None);
    }

    #[test]
    fn test_month_is_zero_padded() {
        assert_eq!(
            canon(Some("2024-03-09"), Some("Taco Stand")).as_deref(),
            Some("2024_03_Taco_Stand")
        );
    }

    #[test]
    fn test_whitespace_and_hyphen_runs_collapse() {
        assert_eq!(sanitize_name("  Multiple   Spaces  ", None), "Multiple_Spaces");
        assert_eq!(sanitize_name("La - Casa -- Azul", None), "La_Casa_Azul");
        assert_eq!(sanitize_name("_edge_", None), "edge");
    }

    #[test]
    fn test_unprintable_name_becomes_unknown() {
        assert_eq!(sanitize_name("!!!", None), UNKNOWN_NAME);
        assert_eq!(sanitize_name("日本料理", None), UNKNOWN_NAME);
        assert_eq!(
            canon(Some("2025-01-02"), Some("***")).as_deref(),
            Some("2025_01_Unknown")
        );
    }

    #[test]
    fn test_truncation_happens_after_sanitizing() {
        let long = "Ñandú Restaurante y Parrilla Argentina de la Costa";
        let name = sanitize_name(long, Some(DEFAULT_NAME_CAP));
        assert!(name.len() <= DEFAULT_NAME_CAP);
        assert!(name.starts_with("Nandu_Restaurante"));
        assert!(!name.ends_with('_'));
        assert!(name.is_ascii());
    }

    #[test]
    fn test_no_cap_keeps_full_name() {
        let long = "A Very Long Restaurant Name That Keeps Going On";
        assert_eq!(
            sanitize_name(long, None),
            "A_Very_Long_Restaurant_Name_That_Keeps_Going_On"
        );
    }

    #[test]
    fn test_canonicalize_is_deterministic_and_idempotent() {
        let names = [
            "Café René",
            "Restaurant & Bar!",
            "  El   Fogón -- Norteño ",
            "McDonald's #123",
            "Ñandú Restaurante y Parrilla Argentina de la Costa",
            "???",
        ];
        for name in names {
            let first = canon(Some("2025-10-15"), Some(name)).unwrap();
            assert_eq!(canon(Some("2025-10-15"), Some(name)).unwrap(), first);
            let sanitized = sanitize_name(name, Some(DEFAULT_NAME_CAP));
            let again = canon(Some("2025-10-15"), Some(&sanitized)).unwrap();
            assert_eq!(again, first, "not a fixed point for {name:?}");
        }
    }

    #[test]
    fn test_year_month() {
        assert_eq!(year_month("2025-10-15").as_deref(), Some("2025_10"));
        assert_eq!(year_month("oops"), None);
    }

    #[test]
    fn test_make_unique_free_name_unchanged() {
        assert_eq!(make_unique("2025_10_Cafe_Rene", &taken(&[])), "2025_10_Cafe_Rene");
    }

    #[test]
    fn test_make_unique_counts_up() {
        let mut used = taken(&["2025_10_Cafe_Rene"]);
        let second = make_unique("2025_10_Cafe_Rene", &used);
        assert_eq!(second, "2025_10_Cafe_Rene_2");
        used.insert(second);
        assert_eq!(make_unique("2025_10_Cafe_Rene", &used), "2025_10_Cafe_Rene_3");
    }

    #[test]
    fn test_make_unique_fills_first_gap() {
        let used = taken(&["x", "x_3", "x_4"]);
        assert_eq!(make_unique("x", &used), "x_2");
    }

    #[test]
    fn test_make_unique_keeps_extension_last() {
        let used = taken(&["2025_10_Cafe.pdf", "2025_10_Cafe_2.pdf"]);
        assert_eq!(make_unique("2025_10_Cafe.pdf", &used), "2025_10_Cafe_3.pdf");
    }

    #[test]
    fn test_make_unique_independent_of_set_order() {
        let names: Vec<String> = (2..50).map(|n| format!("dup_{n}")).chain(["dup".to_string()]).collect();
        let forward: HashSet<String> = names.iter().cloned().collect();
        let backward: HashSet<String> = names.iter().rev().cloned().collect();
        assert_eq!(make_unique("dup", &forward), "dup_50");
        assert_eq!(make_unique("dup", &backward), "dup_50");
    }
}
