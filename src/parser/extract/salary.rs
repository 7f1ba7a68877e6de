use std::sync::LazyLock;

use regex::Regex;

use super::find_word;
use crate::listing::SalaryRange;

// Integer part with optional thousands groups, optional decimals, optional "k".
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:[.,]\d{3})+|\d+)(?:[.,](\d{1,2}))?(?:\s*(k)\b)?").unwrap()
});

const CURRENCY_CODES: &[(&str, &str)] = &[
    ("pln", "PLN"),
    ("zł", "PLN"),
    ("zl", "PLN"),
    ("eur", "EUR"),
    ("usd", "USD"),
    ("gbp", "GBP"),
    ("chf", "CHF"),
];

const CURRENCY_SYMBOLS: &[(char, &str)] = &[('€', "EUR"), ('$', "USD"), ('£', "GBP")];

const UPPER_BOUND_PREFIXES: &[&str] = &["up to", "do", "max", "max.", "maximum"];

/// Parse a free-text salary. Anything without a number is `None`, not an error.
pub fn parse(raw: Option<&str>) -> Option<SalaryRange> {
    let text = collapse_digit_groups(raw?);
    let amounts: Vec<(usize, u32)> = AMOUNT_RE
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            // "B2B" is not an amount
            if text[..whole.start()].chars().next_back().is_some_and(char::is_alphanumeric) {
                return None;
            }
            let value = amount(&caps[1], caps.get(2).map(|m| m.as_str()), caps.get(3).is_some())?;
            Some((whole.start(), value))
        })
        .take(2)
        .collect();

    let (min, max) = match amounts.as_slice() {
        [] => return None,
        [(start, only)] => {
            let prefix = text[..*start].trim_end().to_lowercase();
            if UPPER_BOUND_PREFIXES.iter().any(|p| ends_with_word(&prefix, p)) {
                (None, Some(*only))
            } else {
                (Some(*only), None)
            }
        }
        [(_, a), (_, b), ..] => (Some(*a.min(b)), Some(*a.max(b))),
    };

    Some(SalaryRange {
        min,
        max,
        currency: detect_currency(&text),
    })
}

/// `word` closes `text` and is not the tail of a longer word ("Orlando" does not end with "do").
fn ends_with_word(text: &str, word: &str) -> bool {
    text.strip_suffix(word)
        .is_some_and(|rest| !rest.chars().next_back().is_some_and(char::is_alphanumeric))
}

fn amount(integer: &str, decimals: Option<&str>, thousands: bool) -> Option<u32> {
    let digits: String = integer.chars().filter(char::is_ascii_digit).collect();
    let mut value: f64 = digits.parse().ok()?;
    if let Some(d) = decimals {
        value += format!("0.{}", d).parse::<f64>().ok()?;
    }
    if thousands {
        value *= 1000.0;
    }
    let rounded = value.round();
    if rounded <= 0.0 || rounded > u32::MAX as f64 {
        return None;
    }
    Some(rounded as u32)
}

/// Earliest currency code or symbol in the text.
pub fn detect_currency(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let codes = CURRENCY_CODES
        .iter()
        .filter_map(|(needle, code)| find_word(&lower, needle).map(|pos| (pos, *code)));
    let symbols = CURRENCY_SYMBOLS
        .iter()
        .filter_map(|(symbol, code)| lower.find(*symbol).map(|pos| (pos, *code)));
    codes
        .chain(symbols)
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, code)| code.to_string())
}

/// "12 000 – 18 000" → "12000 – 18000": drop whitespace that splits a thousands group.
fn collapse_digit_groups(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c.is_whitespace() && i > 0 && chars[i - 1].is_ascii_digit() {
            let group = chars.get(i + 1..i + 4);
            let full_group = group.is_some_and(|g| g.iter().all(char::is_ascii_digit));
            let ends = !chars.get(i + 4).is_some_and(char::is_ascii_digit);
            if full_group && ends {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: Option<u32>, max: Option<u32>, currency: Option<&str>) -> Option<SalaryRange> {
        Some(SalaryRange {
            min,
            max,
            currency: currency.map(str::to_string),
        })
    }

    #[test]
    fn plain_range_with_code() {
        assert_eq!(parse(Some("8000-12000 PLN")), range(Some(8000), Some(12000), Some("PLN")));
    }

    #[test]
    fn no_number_is_null_range() {
        assert_eq!(parse(Some("competitive")), None);
        assert_eq!(parse(Some("")), None);
        assert_eq!(parse(None), None);
    }

    #[test]
    fn board_format_with_spaced_thousands() {
        assert_eq!(
            parse(Some("12 000 – 18 000 zł netto (+ VAT) / mies.")),
            range(Some(12000), Some(18000), Some("PLN"))
        );
        // non-breaking and narrow no-break spaces
        assert_eq!(
            parse(Some("9\u{a0}500–14\u{202f}000 zł brutto")),
            range(Some(9500), Some(14000), Some("PLN"))
        );
    }

    #[test]
    fn thousands_suffix_and_symbols() {
        assert_eq!(parse(Some("€4k - €5.5k")), range(Some(4000), Some(5500), Some("EUR")));
        assert_eq!(parse(Some("$120,000 - $150,000")), range(Some(120000), Some(150000), Some("USD")));
    }

    #[test]
    fn single_amounts() {
        assert_eq!(parse(Some("from 10000 PLN")), range(Some(10000), None, Some("PLN")));
        assert_eq!(parse(Some("up to 15 000 EUR")), range(None, Some(15000), Some("EUR")));
        assert_eq!(parse(Some("do 9000 zł")), range(None, Some(9000), Some("PLN")));
    }

    #[test]
    fn digits_inside_words_are_not_amounts() {
        assert_eq!(
            parse(Some("B2B: 15 000 – 20 000 PLN")),
            range(Some(15000), Some(20000), Some("PLN"))
        );
        assert_eq!(
            parse(Some("10 000 zł netto (+ VAT) / mies. B2B")),
            range(Some(10000), None, Some("PLN"))
        );
        assert_eq!(parse(Some("B2B")), None);
    }

    #[test]
    fn upper_bound_prefix_must_be_a_word() {
        assert_eq!(parse(Some("Orlando 9000 USD")), range(Some(9000), None, Some("USD")));
        assert_eq!(parse(Some("Gdańsk, max. 9000 zł")), range(None, Some(9000), Some("PLN")));
        assert_eq!(parse(Some("(do 7 000 PLN)")), range(None, Some(7000), Some("PLN")));
    }

    #[test]
    fn reversed_range_is_ordered() {
        assert_eq!(parse(Some("12000 - 8000 CHF")), range(Some(8000), Some(12000), Some("CHF")));
    }

    #[test]
    fn range_without_currency() {
        assert_eq!(parse(Some("8000 - 10000")), range(Some(8000), Some(10000), None));
    }

    #[test]
    fn currency_inside_words_is_ignored() {
        assert_eq!(detect_currency("umowa zlecenie"), None);
        assert_eq!(detect_currency("100 euro"), None);
    }
}
