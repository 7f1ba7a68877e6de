pub mod detail;
pub mod extract;
pub mod offers;
pub mod skills;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::listing::{Experience, Listing};
use crate::taxonomy::{ExperienceBand, Taxonomy};
use detail::{Fragment, ParseError};
use skills::SkillClassifier;

/// Raw detail page as fetched.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub url: String,
    pub html: String,
}

/// One detail page that could not become a listing.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{url}: {source}")]
pub struct ListingError {
    pub url: String,
    pub source: ParseError,
}

/// Pure per-record pipeline: markup → fragment → listing. Safe to share across threads.
pub struct Pipeline {
    source: String,
    skills: SkillClassifier,
    bands: Vec<ExperienceBand>,
    scraped_at: DateTime<Utc>,
}

impl Pipeline {
    pub fn new(source: &str, taxonomy: &Taxonomy, scraped_at: DateTime<Utc>) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            skills: SkillClassifier::new(&taxonomy.skills)?,
            bands: taxonomy.experience_bands.clone(),
            scraped_at,
        })
    }

    pub fn skills(&self) -> &SkillClassifier {
        &self.skills
    }

    pub fn bands(&self) -> &[ExperienceBand] {
        &self.bands
    }

    fn band_floor(&self, experience: &Experience) -> Option<u32> {
        match experience {
            Experience::Band(label) => self.bands.iter().find(|b| &b.label == label).map(|b| b.min_years),
            Experience::Unknown => None,
        }
    }

    pub fn process_page(&self, page: &RawPage) -> Result<Listing, ListingError> {
        let fragment = detail::parse_detail(&page.url, &page.html).map_err(|source| ListingError {
            url: page.url.clone(),
            source,
        })?;
        Ok(self.normalize(fragment))
    }

    /// Field normalizer + skill classifier. Missing fragment fields become
    /// `None` / empty / `Unknown`, never an error.
    pub fn normalize(&self, fragment: Fragment) -> Listing {
        let title = fragment.title.unwrap_or_default();
        let description = fragment.description.unwrap_or_default();

        let technologies = fragment.technologies.join(", ");
        let classified_text = [title.as_str(), description.as_str(), technologies.as_str()].join("\n");

        let experience = extract::experience::classify(
            fragment.position_levels.as_deref(),
            Some(title.as_str()),
            Some(description.as_str()),
            &self.bands,
        );
        let experience_years = self.band_floor(&experience);

        Listing {
            job_id: extract::job_id(fragment.offer_id.as_deref(), &fragment.url),
            source: self.source.clone(),
            company: fragment.company,
            salary: extract::salary::parse(fragment.salary.as_deref()),
            locations: extract::location::cities(&fragment.locations),
            mode: extract::mode::classify(fragment.work_modes.as_deref(), Some(description.as_str())),
            experience,
            experience_years,
            contract_type: extract::contract_type(fragment.contract.as_deref()),
            skills: self.skills.classify(&classified_text),
            scraped_at: self.scraped_at,
            url: fragment.url,
            title,
            description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{OperatingMode, SalaryRange};

    fn pipeline() -> Pipeline {
        Pipeline::new("theprotocol.it", &Taxonomy::embedded().unwrap(), Utc::now()).unwrap()
    }

    #[test]
    fn full_offer_to_listing() {
        let page = RawPage {
            url: "https://theprotocol.it/szczegoly/praca/data-analyst-warszawa,oferta,1f2e3d4c-0001".into(),
            html: std::fs::read_to_string("tests/fixtures/offer_full.html").unwrap(),
        };
        let l = pipeline().process_page(&page).unwrap();
        assert_eq!(l.job_id, "448812");
        assert_eq!(l.source, "theprotocol.it");
        assert_eq!(l.company.as_deref(), Some("Nordic Analytics Sp. z o.o."));
        assert_eq!(
            l.salary,
            Some(SalaryRange {
                min: Some(12000),
                max: Some(16000),
                currency: Some("PLN".into())
            })
        );
        assert_eq!(l.locations, vec!["Warszawa", "Kraków"]);
        assert_eq!(l.mode, OperatingMode::Hybrid);
        // explicit "3+ years" in the requirements beats the junior/mid levels
        assert_eq!(l.experience, Experience::Band("3-5 years".into()));
        assert_eq!(l.experience_years, Some(3));
        assert_eq!(l.contract_type.as_deref(), Some("B2B"));
        assert_eq!(l.skill_names(), vec!["dax", "powerbi", "python", "snowflake", "sql"]);
    }

    #[test]
    fn description_only_example() {
        let fragment = Fragment {
            url: "https://theprotocol.it/x,oferta,abc".into(),
            title: Some("Analyst".into()),
            description: Some("Required skills: Python, AWS, Power BI, 3+ years experience, hybrid work".into()),
            ..Default::default()
        };
        let l = pipeline().normalize(fragment);
        assert_eq!(l.skill_names(), vec!["aws", "powerbi", "python"]);
        assert_eq!(l.experience, Experience::Band("3-5 years".into()));
        assert_eq!(l.mode, OperatingMode::Hybrid);
        assert_eq!(l.job_id, "abc");
    }

    #[test]
    fn missing_fields_map_to_unknown_markers() {
        let p = pipeline();
        // every subset of optional fields left out
        for mask in 0u32..(1 << 8) {
            let keep = |bit: u32| mask & (1 << bit) != 0;
            let fragment = Fragment {
                url: "https://theprotocol.it/y,oferta,1".into(),
                offer_id: keep(0).then(|| "77".to_string()),
                title: Some("Analyst".into()),
                company: keep(1).then(|| "Acme".to_string()),
                work_modes: keep(2).then(|| "remote".to_string()),
                locations: if keep(3) { vec!["Gdańsk".into()] } else { vec![] },
                contract: keep(4).then(|| "UoP".to_string()),
                position_levels: keep(5).then(|| "senior".to_string()),
                salary: keep(6).then(|| "10 000 PLN".to_string()),
                technologies: vec![],
                description: keep(7).then(|| "Nothing specific".to_string()),
            };
            let l = p.normalize(fragment);
            assert_eq!(l.company.is_none(), !keep(1));
            assert_eq!(l.mode == OperatingMode::Unknown, !keep(2));
            assert_eq!(l.locations.is_empty(), !keep(3));
            assert_eq!(l.contract_type.is_none(), !keep(4));
            assert_eq!(l.experience == Experience::Unknown, !keep(5));
            assert_eq!(l.experience_years, keep(5).then_some(5));
            assert_eq!(l.salary.is_none(), !keep(6));
            assert_eq!(l.job_id, if keep(0) { "77" } else { "1" });
            assert!(l.skills.is_empty());
        }
    }

    #[test]
    fn titleless_page_is_a_parse_failure() {
        let page = RawPage {
            url: "https://theprotocol.it/z,oferta,2".into(),
            html: "<html><body>gone</body></html>".into(),
        };
        let err = pipeline().process_page(&page).unwrap_err();
        assert_eq!(err.source, ParseError::MissingTitle);
        assert_eq!(err.url, page.url);
    }
}
