use std::collections::BTreeSet;

use regex::{RegexSet, RegexSetBuilder};

use crate::listing::SkillTag;
use crate::taxonomy::SkillEntry;

// Boundaries are any non-alphanumeric char; the right side also refuses `+`/`#`
// so that "c" never matches inside "c++" or "c#".
const LEFT_BOUNDARY: &str = r"(?:^|[^\p{L}\p{N}])";
const RIGHT_BOUNDARY: &str = r"(?:$|[^\p{L}\p{N}+#])";

/// Deterministic dictionary matcher: one pattern per canonical tag, synonyms as alternatives.
pub struct SkillClassifier {
    patterns: RegexSet,
    tags: Vec<SkillTag>,
}

impl SkillClassifier {
    pub fn new(entries: &[SkillEntry]) -> Result<Self, regex::Error> {
        let patterns: Vec<String> = entries.iter().map(|e| tag_pattern(&e.matchers)).collect();
        let patterns = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .size_limit(64 * (1 << 20))
            .build()?;
        let tags = entries
            .iter()
            .map(|e| SkillTag {
                name: e.tag.clone(),
                category: e.category.clone(),
            })
            .collect();
        Ok(Self { patterns, tags })
    }

    pub fn classify(&self, text: &str) -> BTreeSet<SkillTag> {
        self.patterns
            .matches(text)
            .into_iter()
            .map(|i| self.tags[i].clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }
}

fn tag_pattern(matchers: &[String]) -> String {
    let alternatives: Vec<String> = matchers
        .iter()
        .map(|m| {
            m.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .filter(|m| !m.is_empty())
        .collect();
    format!("{}(?:{}){}", LEFT_BOUNDARY, alternatives.join("|"), RIGHT_BOUNDARY)
}
