pub mod experience;
pub mod location;
pub mod mode;
pub mod salary;

use std::sync::LazyLock;

use regex::Regex;

static PARENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]+)\)").unwrap());
static OFFER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",oferta,([A-Za-z0-9\-]+)").unwrap());

/// Byte offset of the first whole-word occurrence of `needle` in `haystack`.
/// Both sides are expected to be lowercased already.
pub fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.match_indices(needle).find_map(|(start, m)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + m.len()..].chars().next();
        let open = before.map_or(true, |c| !c.is_alphanumeric());
        let close = after.map_or(true, |c| !c.is_alphanumeric());
        (open && close).then_some(start)
    })
}

/// "Contract of employment (B2B)" → "B2B"; no parentheses → whole text.
pub fn contract_type(raw: Option<&str>) -> Option<String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match PARENS_RE.captures(raw) {
        Some(caps) => Some(caps[1].trim().to_string()),
        None => Some(raw.to_string()),
    }
}

/// Board offer id when numeric, else the id embedded in the offer URL, else the URL.
pub fn job_id(offer_id: Option<&str>, url: &str) -> String {
    if let Some(id) = offer_id.map(str::trim) {
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
            return id.to_string();
        }
    }
    OFFER_ID_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_words_only() {
        assert_eq!(find_word("hybrid work", "hybrid"), Some(0));
        assert_eq!(find_word("praca zdalna", "zdalna"), Some(6));
        assert_eq!(find_word("remotely", "remote"), None);
        assert_eq!(find_word("not remote, remote", "remote"), Some(4));
        assert_eq!(find_word("", "remote"), None);
    }

    #[test]
    fn contract_from_parentheses() {
        assert_eq!(
            contract_type(Some("kontrakt B2B (B2B contract)")).as_deref(),
            Some("B2B contract")
        );
        assert_eq!(contract_type(Some(" umowa o pracę ")).as_deref(), Some("umowa o pracę"));
        assert_eq!(contract_type(Some("  ")), None);
        assert_eq!(contract_type(None), None);
    }

    #[test]
    fn job_id_precedence() {
        let url = "https://theprotocol.it/szczegoly/praca/bi-developer-warszawa,oferta,952b0000-9568-9a92";
        assert_eq!(job_id(Some("12345"), url), "12345");
        assert_eq!(job_id(Some("n/a"), url), "952b0000-9568-9a92");
        assert_eq!(job_id(None, "https://example.com/x"), "https://example.com/x");
    }
}
