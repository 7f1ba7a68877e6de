use config::{Config, ConfigError, Environment};
use serde::Deserialize;

const ENV_PREFIX: &str = "JOBMINER";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Runtime settings, read once at process start from `JOBMINER_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_path: String,
    pub base_url: String,
    pub search_path: String,
    pub source: String,
    pub page_size: usize,
    pub max_pages: u32,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    #[serde(default)]
    pub taxonomy_path: Option<String>,
    pub use_browser: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(Environment::with_prefix(ENV_PREFIX))
    }

    #[cfg(test)]
    pub(crate) fn from_env_map(vars: &[(&str, &str)]) -> Result<Self, ConfigError> {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::build(Environment::with_prefix(ENV_PREFIX).source(Some(map)))
    }

    fn build(env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("database_path", "data/jobminer.sqlite")?
            .set_default("base_url", "https://theprotocol.it")?
            .set_default(
                "search_path",
                "/filtry/big-data-science;sp/junior,assistant,trainee,mid;p/warszawa;wp",
            )?
            .set_default("source", "theprotocol.it")?
            .set_default("page_size", 50_i64)?
            .set_default("max_pages", 20_i64)?
            .set_default("concurrency", 8_i64)?
            .set_default("timeout_secs", 30_i64)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("use_browser", false)?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("concurrency", self.concurrency == 0),
            ("page_size", self.page_size == 0),
            ("max_pages", self.max_pages == 0),
            ("timeout_secs", self.timeout_secs == 0),
        ];
        if let Some((key, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Message(format!("{} must be greater than zero", key)));
        }
        if self.source.trim().is_empty() {
            return Err(ConfigError::Message("source must not be empty".into()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Message(format!("base_url {:?}: {}", self.base_url, e)))?;
        Ok(())
    }

    /// 1-based list page URL.
    pub fn list_page_url(&self, page: u32) -> String {
        format!(
            "{}{}?page={}",
            self.base_url.trim_end_matches('/'),
            self.search_path,
            page
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::from_env_map(&[]).unwrap();
        assert_eq!(s.database_path, "data/jobminer.sqlite");
        assert_eq!(s.source, "theprotocol.it");
        assert_eq!(s.page_size, 50);
        assert_eq!(s.max_pages, 20);
        assert_eq!(s.concurrency, 8);
        assert_eq!(s.timeout_secs, 30);
        assert!(s.taxonomy_path.is_none());
        assert!(!s.use_browser);
    }

    #[test]
    fn environment_overrides() {
        let s = Settings::from_env_map(&[
            ("JOBMINER_CONCURRENCY", "3"),
            ("JOBMINER_DATABASE_PATH", "/tmp/x.sqlite"),
            ("JOBMINER_TAXONOMY_PATH", "/etc/taxonomy.json"),
            ("JOBMINER_USE_BROWSER", "true"),
        ])
        .unwrap();
        assert_eq!(s.concurrency, 3);
        assert_eq!(s.database_path, "/tmp/x.sqlite");
        assert_eq!(s.taxonomy_path.as_deref(), Some("/etc/taxonomy.json"));
        assert!(s.use_browser);
    }

    #[test]
    fn zero_values_rejected() {
        assert!(Settings::from_env_map(&[("JOBMINER_CONCURRENCY", "0")]).is_err());
        assert!(Settings::from_env_map(&[("JOBMINER_PAGE_SIZE", "0")]).is_err());
        assert!(Settings::from_env_map(&[("JOBMINER_MAX_PAGES", "0")]).is_err());
    }

    #[test]
    fn bad_base_url_rejected() {
        assert!(Settings::from_env_map(&[("JOBMINER_BASE_URL", "not a url")]).is_err());
    }

    #[test]
    fn list_page_urls() {
        let s = Settings::from_env_map(&[
            ("JOBMINER_BASE_URL", "http://127.0.0.1:9000/"),
            ("JOBMINER_SEARCH_PATH", "/filtry/x"),
        ])
        .unwrap();
        assert_eq!(s.list_page_url(1), "http://127.0.0.1:9000/filtry/x?page=1");
        assert_eq!(s.list_page_url(3), "http://127.0.0.1:9000/filtry/x?page=3");
    }
}
