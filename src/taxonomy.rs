use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

const EMBEDDED_TAXONOMY: &str = include_str!("../taxonomy.json");

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("cannot read taxonomy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed taxonomy: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid taxonomy: {0}")]
    Invalid(String),
}

/// Source-specific tuning data: the skill dictionary and the experience bands.
#[derive(Debug, Clone, Deserialize)]
pub struct Taxonomy {
    pub skills: Vec<SkillEntry>,
    pub experience_bands: Vec<ExperienceBand>,
}

/// One canonical skill tag and every spelling that collapses onto it.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillEntry {
    pub tag: String,
    pub category: String,
    pub matchers: Vec<String>,
}

/// Half-open `[min_years, max_years)` interval; `max_years = None` is open-ended.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperienceBand {
    pub label: String,
    pub min_years: u32,
    #[serde(default)]
    pub max_years: Option<u32>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ExperienceBand {
    pub fn contains(&self, years: u32) -> bool {
        years >= self.min_years && self.max_years.map_or(true, |max| years < max)
    }
}

impl Taxonomy {
    pub fn embedded() -> Result<Self, TaxonomyError> {
        Self::from_json(EMBEDDED_TAXONOMY)
    }

    pub fn from_path(path: &Path) -> Result<Self, TaxonomyError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Embedded data unless an override file is configured.
    pub fn load(path: Option<&str>) -> Result<Self, TaxonomyError> {
        match path {
            Some(p) => Self::from_path(Path::new(p)),
            None => Self::embedded(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, TaxonomyError> {
        let taxonomy: Taxonomy = serde_json::from_str(raw)?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    fn validate(&self) -> Result<(), TaxonomyError> {
        if self.skills.is_empty() {
            return Err(TaxonomyError::Invalid("skill dictionary is empty".into()));
        }
        let mut tags = HashSet::new();
        for entry in &self.skills {
            if entry.tag.trim().is_empty() {
                return Err(TaxonomyError::Invalid("skill with empty tag".into()));
            }
            if !tags.insert(entry.tag.as_str()) {
                return Err(TaxonomyError::Invalid(format!("duplicate skill tag '{}'", entry.tag)));
            }
            if entry.matchers.iter().all(|m| m.trim().is_empty()) {
                return Err(TaxonomyError::Invalid(format!("skill '{}' has no matchers", entry.tag)));
            }
        }

        if self.experience_bands.is_empty() {
            return Err(TaxonomyError::Invalid("no experience bands".into()));
        }
        let mut labels = HashSet::new();
        for pair in self.experience_bands.windows(2) {
            if pair[1].min_years <= pair[0].min_years {
                return Err(TaxonomyError::Invalid(format!(
                    "experience bands must be ordered by min_years ('{}' after '{}')",
                    pair[1].label, pair[0].label
                )));
            }
        }
        for band in &self.experience_bands {
            if !labels.insert(band.label.as_str()) {
                return Err(TaxonomyError::Invalid(format!("duplicate band '{}'", band.label)));
            }
            if band.max_years.is_some_and(|max| max <= band.min_years) {
                return Err(TaxonomyError::Invalid(format!("band '{}' is empty", band.label)));
            }
        }
        Ok(())
    }
}
