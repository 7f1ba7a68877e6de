use std::sync::LazyLock;

use regex::Regex;

use super::find_word;
use crate::listing::Experience;
use crate::taxonomy::ExperienceBand;

// "3+ years", "2-4 years", "at least 5 yrs", "3 lata", "min. 2 lat", "1,5 roku"
static YEARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:[.,]\d+)?\s*\+?\s*(?:(?:-|–|to)\s*\d{1,2}\s*\+?\s*)?(?:years?|yrs?|lata|lat|roku|rok)\b",
    )
    .unwrap()
});

const MAX_PLAUSIBLE_YEARS: u32 = 40;

/// Map phrasing to a band. An explicit year count beats seniority keywords;
/// several keywords resolve to the lowest band. Nothing recognised is `Unknown`.
pub fn classify(
    levels: Option<&str>,
    title: Option<&str>,
    description: Option<&str>,
    bands: &[ExperienceBand],
) -> Experience {
    let years = [levels, description].into_iter().flatten().find_map(years_required);
    if let Some(band) = years.and_then(|y| bands.iter().find(|b| b.contains(y))) {
        return Experience::Band(band.label.clone());
    }

    [levels, title]
        .into_iter()
        .flatten()
        .find_map(|text| lowest_keyword_band(text, bands))
        .map(|band| Experience::Band(band.label.clone()))
        .unwrap_or(Experience::Unknown)
}

/// Whole years only: "1,5 roku" counts as 1.
fn years_required(text: &str) -> Option<u32> {
    YEARS_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter(|m| !after_decimal_separator(text, m.start()))
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .find(|y| *y <= MAX_PLAUSIBLE_YEARS)
}

fn after_decimal_separator(text: &str, start: usize) -> bool {
    let mut before = text[..start].chars().rev();
    matches!(
        (before.next(), before.next()),
        (Some('.' | ','), Some(d)) if d.is_ascii_digit()
    )
}

fn lowest_keyword_band<'a>(text: &str, bands: &'a [ExperienceBand]) -> Option<&'a ExperienceBand> {
    let lower = text.to_lowercase();
    bands.iter().find(|band| {
        band.keywords
            .iter()
            .any(|kw| find_word(&lower, &kw.to_lowercase()).is_some())
    })
}
