use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static REMARK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());

const SEPARATORS: &[char] = &[',', ';', '/', '|', '•'];

/// Split raw location strings into city names, first-seen order, no duplicates.
pub fn cities(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .flat_map(|r| {
            let cleaned = REMARK_RE.replace_all(r, " ");
            cleaned
                .split(SEPARATORS)
                .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
        })
        .filter(|city| !city.is_empty())
        .filter(|city| seen.insert(city.to_lowercase()))
        .collect()
}
