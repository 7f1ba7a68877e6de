use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// Declared work arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    OnSite,
    Hybrid,
    Remote,
    Unknown,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::OnSite => "on-site",
            OperatingMode::Hybrid => "hybrid",
            OperatingMode::Remote => "remote",
            OperatingMode::Unknown => "unknown",
        }
    }
}

/// Minimum experience, as one of the configured bands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Experience {
    Band(String),
    Unknown,
}

impl Experience {
    pub fn as_str(&self) -> &str {
        match self {
            Experience::Band(label) => label,
            Experience::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
    /// ISO 4217 code.
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SkillTag {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub url: String,
    pub source: String,
    pub job_id: String,
    pub title: String,
    pub company: Option<String>,
    pub salary: Option<SalaryRange>,
    pub locations: Vec<String>,
    pub mode: OperatingMode,
    pub experience: Experience,
    /// Lower bound of the experience band, for numeric queries.
    pub experience_years: Option<u32>,
    pub contract_type: Option<String>,
    pub description: String,
    pub skills: BTreeSet<SkillTag>,
    pub scraped_at: DateTime<Utc>,
}

impl Listing {
    pub fn skill_names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name.as_str()).collect()
    }
}
