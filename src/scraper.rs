use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};
use url::Url;

use crate::parser::{offers, RawPage};
use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[cfg(feature = "browser")]
    #[error("browser could not load {url}: {message}")]
    Browser { url: String, message: String },
}

/// Anything that turns a URL into page markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

// ── Plain HTTP ──

pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pl-PL,pl;q=0.9,en-US;q=0.8,en;q=0.7"));

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(request_error)
    }
}

// ── Crawl ──

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub list_pages: usize,
    pub list_failures: usize,
    pub offers: usize,
    pub fetched: usize,
    pub fetch_failures: usize,
}

/// Walks the paginated search results, then pulls every offer page through a bounded pool.
pub struct Crawler {
    source: Arc<dyn PageSource>,
    settings: Settings,
    base: Url,
}

impl Crawler {
    pub fn new(source: Arc<dyn PageSource>, settings: &Settings) -> Result<Self, url::ParseError> {
        Ok(Self {
            source,
            base: Url::parse(&settings.base_url)?,
            settings: settings.clone(),
        })
    }

    /// Offer URLs across all list pages, in discovery order.
    pub async fn discover(&self, stats: &mut CrawlStats) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut offers = Vec::new();

        for page in 1..=self.settings.max_pages {
            let url = self.settings.list_page_url(page);
            let html = match self.source.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(page, error = %e, "list page failed, moving on");
                    stats.list_failures += 1;
                    continue;
                }
            };
            stats.list_pages += 1;

            let links = offers::extract_offer_links(&html, &self.base);
            let found = links.len();
            let fresh: Vec<String> = links.into_iter().filter(|l| seen.insert(l.clone())).collect();
            debug!(page, found, new = fresh.len(), "list page");

            if fresh.is_empty() {
                break;
            }
            offers.extend(fresh);
            if found < self.settings.page_size {
                break;
            }
        }

        stats.offers = offers.len();
        info!(offers = offers.len(), pages = stats.list_pages, "discovery finished");
        offers
    }

    /// Fetch detail pages concurrently. Failed pages are counted and dropped;
    /// the rest come back in input order.
    pub async fn fetch_details(&self, urls: Vec<String>, stats: &mut CrawlStats) -> Vec<RawPage> {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let pb = progress_bar(urls.len());

        let (tx, mut rx) =
            mpsc::channel::<(usize, String, Result<String, FetchError>)>(self.settings.concurrency * 2);

        for (idx, url) in urls.into_iter().enumerate() {
            let source = Arc::clone(&self.source);
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return;
                };
                let result = source.fetch(&url).await;
                let _ = tx.send((idx, url, result)).await;
            });
        }

        // rx closes once every task has sent
        drop(tx);

        let mut pages = Vec::new();
        while let Some((idx, url, result)) = rx.recv().await {
            match result {
                Ok(html) => {
                    stats.fetched += 1;
                    pages.push((idx, RawPage { url, html }));
                }
                Err(e) => {
                    warn!(error = %e, "skipping offer page");
                    stats.fetch_failures += 1;
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        pages.sort_by_key(|(idx, _)| *idx);
        pages.into_iter().map(|(_, page)| page).collect()
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer, page_size: &str) -> Settings {
        let base = server.uri();
        Settings::from_env_map(&[
            ("JOBMINER_BASE_URL", base.as_str()),
            ("JOBMINER_SEARCH_PATH", "/jobs"),
            ("JOBMINER_PAGE_SIZE", page_size),
            ("JOBMINER_MAX_PAGES", "5"),
            ("JOBMINER_CONCURRENCY", "4"),
        ])
        .unwrap()
    }

    fn list_html(ids: &[u32]) -> String {
        let anchors: String = ids
            .iter()
            .map(|id| format!(r#"<a href="/praca/offer-{id},oferta,{id}">Offer {id}</a>"#))
            .collect();
        format!("<html><body>{}</body></html>", anchors)
    }

    async fn mount_list(server: &MockServer, page: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/jobs"))
            .and(query_param("page", page))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn crawler(server: &MockServer, page_size: &str) -> Crawler {
        let s = settings(server, page_size);
        let source = Arc::new(HttpSource::new(&s).unwrap());
        Crawler::new(source, &s).unwrap()
    }

    #[tokio::test]
    async fn http_source_reads_body_and_rejects_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>hi</h1>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/boom"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpSource::new(&settings(&server, "50")).unwrap();
        let body = source.fetch(&format!("{}/ok", server.uri())).await.unwrap();
        assert_eq!(body, "<h1>hi</h1>");

        let err = source.fetch(&format!("{}/boom", server.uri())).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn discovery_stops_on_short_page() {
        let server = MockServer::start().await;
        mount_list(&server, "1", ResponseTemplate::new(200).set_body_string(list_html(&[1, 2]))).await;
        mount_list(&server, "2", ResponseTemplate::new(200).set_body_string(list_html(&[3]))).await;

        let mut stats = CrawlStats::default();
        let offers = crawler(&server, "2").discover(&mut stats).await;
        assert_eq!(offers.len(), 3);
        assert!(offers[2].ends_with(",oferta,3"));
        assert_eq!(stats.list_pages, 2);
        assert_eq!(stats.offers, 3);
        assert_eq!(stats.list_failures, 0);
    }

    #[tokio::test]
    async fn discovery_stops_when_page_repeats() {
        let server = MockServer::start().await;
        // a board that ignores ?page returns the same results forever
        Mock::given(method("GET"))
            .and(path("/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(list_html(&[1, 2])))
            .mount(&server)
            .await;

        let mut stats = CrawlStats::default();
        let offers = crawler(&server, "2").discover(&mut stats).await;
        assert_eq!(offers.len(), 2);
        assert_eq!(stats.list_pages, 2);
    }

    #[tokio::test]
    async fn failed_list_page_is_skipped() {
        let server = MockServer::start().await;
        mount_list(&server, "1", ResponseTemplate::new(500)).await;
        mount_list(&server, "2", ResponseTemplate::new(200).set_body_string(list_html(&[7]))).await;

        let mut stats = CrawlStats::default();
        let offers = crawler(&server, "2").discover(&mut stats).await;
        assert_eq!(offers.len(), 1);
        assert_eq!(stats.list_failures, 1);
        assert_eq!(stats.list_pages, 1);
    }

    #[tokio::test]
    async fn details_keep_order_and_drop_failures() {
        let server = MockServer::start().await;
        for id in 0..10 {
            let status = if id == 4 { 500 } else { 200 };
            Mock::given(method("GET"))
                .and(path(format!("/offer/{}", id)))
                .respond_with(ResponseTemplate::new(status).set_body_string(format!("<h1>{}</h1>", id)))
                .mount(&server)
                .await;
        }
        let urls: Vec<String> = (0..10).map(|id| format!("{}/offer/{}", server.uri(), id)).collect();

        let mut stats = CrawlStats::default();
        let pages = crawler(&server, "50").fetch_details(urls.clone(), &mut stats).await;
        assert_eq!(stats.fetched, 9);
        assert_eq!(stats.fetch_failures, 1);
        let got: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        let expected: Vec<&str> = urls.iter().filter(|u| !u.ends_with("/4")).map(String::as_str).collect();
        assert_eq!(got, expected);
        assert_eq!(pages[0].html, "<h1>0</h1>");
    }
}
