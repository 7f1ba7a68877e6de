use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::scraper::{FetchError, PageSource};
use crate::settings::Settings;

/// Headless Chrome for boards that render offers client-side.
/// `CHROMIUM_REMOTE_DEBUGGING_URL` attaches to a running instance instead of launching one.
pub struct BrowserSource {
    browser: Browser,
    handler: JoinHandle<()>,
    timeout: Duration,
    user_agent: String,
}

impl BrowserSource {
    pub async fn launch(settings: &Settings) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);

        let (browser, mut handler) = match std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL") {
            Ok(url) => {
                info!(%url, "connecting to remote Chrome");
                Browser::connect(url).await?
            }
            Err(_) => {
                let config = BrowserConfig::builder()
                    .no_sandbox()
                    .request_timeout(timeout)
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage")
                    .build()
                    .map_err(anyhow::Error::msg)?;
                Browser::launch(config).await?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            timeout,
            user_agent: settings.user_agent.clone(),
        })
    }

    /// Opens a tab, loads `url` under the timeout and closes the tab again
    /// whether or not loading succeeded.
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        let browser_error = |message: String| FetchError::Browser {
            url: url.to_string(),
            message,
        };
        let timed_out = || browser_error(format!("timed out after {:?}", self.timeout));

        let page = tokio::time::timeout(self.timeout, self.browser.new_page("about:blank"))
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| browser_error(e.to_string()))?;

        let loaded = tokio::time::timeout(self.timeout, async {
            page.set_user_agent(self.user_agent.as_str()).await?;
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            page.content().await
        })
        .await;

        if let Err(e) = page.close().await {
            debug!(%url, error = %e, "tab did not close cleanly");
        }

        match loaded {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(browser_error(e.to_string())),
            Err(_) => Err(timed_out()),
        }
    }
}

impl Drop for BrowserSource {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl PageSource for BrowserSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.render(url).await
    }
}
