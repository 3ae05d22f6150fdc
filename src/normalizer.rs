//! Town-name normalization.
//!
//! Feeds spell the same town many ways ("Jávea", "JAVEA", "Ja\u{301}vea",
//! "moraira_teulada"). `normalize_town_name` folds those variants into one
//! grouping key; it never splits compound names.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Lowercase, strip diacritics, map `_`/`-` to spaces, collapse whitespace.
///
/// Pure and total: the worst case is an empty string. Applying it twice
/// gives the same result as applying it once.
pub fn normalize_town_name(raw: &str) -> String {
    let folded = strip_accents(&strip_accents(raw).to_lowercase());
    let spaced: String = folded
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// NFD decomposition with combining marks removed.
pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// URL slug: accent-free, lowercase, runs of anything else become `-`.
pub fn slugify(name: &str) -> String {
    let folded = strip_accents(name).to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// "la finca golf" -> "La Finca Golf", for display of canonical keys.
pub fn title_case(canonical: &str) -> String {
    canonical
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
