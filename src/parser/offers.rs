use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

const OFFER_MARKER: &str = ",oferta,";

static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Offer URLs on a list page: absolute, without query/fragment, first-seen order, no duplicates.
pub fn extract_offer_links(html: &str, base: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    doc.select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(OFFER_MARKER))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|mut url| {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
