use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScraperConfig;
use crate::models::DocumentFormat;
use crate::utils::error::{AppError, Result};
use crate::utils::sleeper::Sleeper;

/// Browser identification sent with every request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Raw HTML kept as text and parsed on demand, so a `Document` can cross
/// await points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlPage {
    source: String,
}

impl HtmlPage {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn parse(&self) -> scraper::Html {
        scraper::Html::parse_document(&self.source)
    }
}

/// A fetched body, parsed according to the source's declared format.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Html(HtmlPage),
    Json(serde_json::Value),
}

impl Document {
    pub fn parse(body: String, format: DocumentFormat) -> Result<Self> {
        match format {
            DocumentFormat::Html => Ok(Document::Html(HtmlPage::new(body))),
            DocumentFormat::Json => Ok(Document::Json(serde_json::from_str(&body)?)),
        }
    }

    pub fn as_html(&self) -> Result<&HtmlPage> {
        match self {
            Document::Html(page) => Ok(page),
            Document::Json(_) => Err(AppError::Scraping(
                "expected an HTML document, got JSON".to_string(),
            )),
        }
    }

    pub fn as_json(&self) -> Result<&serde_json::Value> {
        match self {
            Document::Json(value) => Ok(value),
            Document::Html(_) => Err(AppError::Scraping(
                "expected a JSON document, got HTML".to_string(),
            )),
        }
    }
}

/// One outbound GET. Implemented by reqwest in production.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpGet: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpGet for ReqwestClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Bounded-retry GET with a fixed pause between attempts.
pub struct Fetcher {
    client: Arc<dyn HttpGet>,
    sleeper: Arc<dyn Sleeper>,
    max_retries: u32,
    request_delay: Duration,
}

impl Fetcher {
    pub fn new(
        client: Arc<dyn HttpGet>,
        sleeper: Arc<dyn Sleeper>,
        max_retries: u32,
        request_delay: Duration,
    ) -> Self {
        Self {
            client,
            sleeper,
            max_retries: max_retries.max(1),
            request_delay,
        }
    }

    pub fn from_config(config: &ScraperConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        let client = ReqwestClient::new(config)?;
        Ok(Self::new(
            Arc::new(client),
            sleeper,
            config.max_retries,
            Duration::from_millis(config.request_delay_ms),
        ))
    }

    pub async fn fetch(&self, url: &str, format: DocumentFormat) -> Result<Document> {
        let body = self.fetch_text(url).await?;
        Document::parse(body, format)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut attempt = 1;
        loop {
            metrics::counter!("sniper_fetch_attempts_total").increment(1);

            match self.client.get_text(url).await {
                Ok(body) => {
                    tracing::debug!(url, attempt, bytes = body.len(), "Fetched");
                    return Ok(body);
                }
                Err(e) if attempt >= self.max_retries => {
                    metrics::counter!("sniper_fetch_failures_total").increment(1);
                    return Err(AppError::FetchExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        url,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Fetch attempt failed, retrying"
                    );
                    self.sleeper.sleep(self.request_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
