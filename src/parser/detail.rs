use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(r#"h1[data-test="text-offerTitle"]"#));
static ANY_H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static COMPANY: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[data-test="anchor-company-link"]"#));
static WORK_MODES: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-test="content-workModes"]"#));
static LOCATION: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"[data-test="text-primaryLocation"], [data-test="text-workplaceAddress"]"#)
});
static CONTRACT: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-test="text-contractName"]"#));
static LEVELS: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-test="content-positionLevels"]"#));
static SALARY: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-test="text-contractSalary"]"#));
static OFFER_ID: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-test="text-offerId"]"#));
static TECHNOLOGY: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-test="chip-technology"]"#));
static SECTIONS: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-test^="section-"]"#));
static MAIN: LazyLock<Selector> = LazyLock::new(|| selector("main, article"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty document")]
    EmptyDocument,
    #[error("no offer title")]
    MissingTitle,
}

/// Best-effort strings lifted from one offer page. `None` means "not on the page".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub url: String,
    pub offer_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub work_modes: Option<String>,
    pub locations: Vec<String>,
    pub contract: Option<String>,
    pub position_levels: Option<String>,
    pub salary: Option<String>,
    pub technologies: Vec<String>,
    pub description: Option<String>,
}

pub fn parse_detail(url: &str, html: &str) -> Result<Fragment, ParseError> {
    if html.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }
    let doc = Html::parse_document(html);

    let title = first_text(&doc, &TITLE)
        .or_else(|| first_text(&doc, &ANY_H1))
        .ok_or(ParseError::MissingTitle)?;

    // "Company: Acme" → "Acme"
    let company = first_text(&doc, &COMPANY)
        .and_then(|c| c.rsplit(':').next().map(|s| s.trim().to_string()))
        .filter(|c| !c.is_empty());

    let position_levels = doc.select(&LEVELS).next().map(|el| {
        el.text()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
            .replace('•', ",")
    });

    Ok(Fragment {
        url: url.to_string(),
        offer_id: first_text(&doc, &OFFER_ID),
        title: Some(title),
        company,
        work_modes: first_text(&doc, &WORK_MODES),
        locations: all_texts(&doc, &LOCATION),
        contract: first_text(&doc, &CONTRACT),
        position_levels: position_levels.filter(|l| !l.is_empty()),
        salary: first_text(&doc, &SALARY),
        technologies: all_texts(&doc, &TECHNOLOGY),
        description: description(&doc),
    })
}

/// Offer sections joined in page order; nested sections are not repeated.
fn description(doc: &Html) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for el in doc.select(&SECTIONS) {
        let text = element_text(el);
        if text.is_empty() || parts.iter().any(|p| p.contains(&text)) {
            continue;
        }
        parts.retain(|p| !text.contains(p.as_str()));
        parts.push(text);
    }
    if parts.is_empty() {
        return first_text(doc, &MAIN).or_else(|| first_text(doc, &BODY));
    }
    Some(parts.join("\n"))
}

fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel).map(element_text).find(|t| !t.is_empty())
}

fn all_texts(doc: &Html, sel: &Selector) -> Vec<String> {
    doc.select(sel)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

fn element_text(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
