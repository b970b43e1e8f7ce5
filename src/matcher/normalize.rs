//! String and URL normalization, and the title/artist similarity measure.

use std::collections::HashSet;

/// Lowercase, drop everything that is not alphanumeric or whitespace, and
/// collapse runs of whitespace.
pub fn normalize_text(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical form of a source URL: no query string or fragment, no trailing
/// slash, lowercase.
pub fn normalize_url(url: &str) -> String {
    let base = url.trim().split(['?', '#']).next().unwrap_or_default();
    base.trim_end_matches('/').to_lowercase()
}

/// First `len` characters of the title, lowercased with whitespace
/// collapsed, used as a fuzzy query.
///
/// Punctuation is kept: stores match it against the raw stored title.
/// Full normalization only applies in [`similarity`].
pub fn title_prefix(title: &str, len: usize) -> String {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .flat_map(char::to_lowercase)
        .take(len)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Similarity of two strings in [0, 1] after normalization.
///
/// - either side empty: 0.0
/// - equal: 1.0
/// - one contains the other: 0.8 to 0.9, by length ratio
/// - otherwise: Jaccard similarity of the character sets (spaces ignored)
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (&a, &b)
    } else {
        (&b, &a)
    };
    if long.contains(short.as_str()) {
        let ratio = short.chars().count() as f64 / long.chars().count() as f64;
        return 0.8 + 0.1 * ratio;
    }

    let set_a: HashSet<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let set_b: HashSet<char> = b.chars().filter(|c| !c.is_whitespace()).collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / union as f64
}
