// Integration tests for Sniper Watch
// These tests drive the public API against a local mock shop

pub mod pipeline_tests;
pub mod scheduler_tests;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sniper_watch::config::{DatabaseConfig, ScraperConfig};
use sniper_watch::models::NotificationKind;
use sniper_watch::plugins::traits::{NotificationContext, NotificationResult, Notifier};
use sniper_watch::utils::sleeper::RecordingSleeper;
use sniper_watch::{
    DocumentFormat, Fetcher, ProviderRegistry, RunMode, Scheduler, SchedulerSettings,
    SearchDefinition, SqliteStore,
};

pub const REQUEST_DELAY: Duration = Duration::from_millis(250);
pub const SNIPE_DELAY: Duration = Duration::from_millis(1_000);

pub fn test_scraper_config() -> ScraperConfig {
    ScraperConfig {
        max_retries: 3,
        request_delay_ms: REQUEST_DELAY.as_millis() as u64,
        snipe_delay_ms: SNIPE_DELAY.as_millis() as u64,
        request_timeout_secs: 5,
        user_agent: "SniperWatch-Test/1.0".to_string(),
    }
}

/// Records every dispatched notification instead of sending mail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(NotificationKind, NotificationContext, Vec<String>)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(NotificationKind, NotificationContext, Vec<String>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent().into_iter().map(|(kind, _, _)| kind).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn dispatch(
        &self,
        kind: NotificationKind,
        context: &NotificationContext,
        recipients: &[String],
    ) -> sniper_watch::Result<NotificationResult> {
        if recipients.is_empty() {
            return Ok(NotificationResult::skipped());
        }
        self.sent
            .lock()
            .unwrap()
            .push((kind, context.clone(), recipients.to_vec()));
        Ok(NotificationResult {
            success: true,
            message_id: None,
            recipients: recipients.len(),
        })
    }
}

pub struct TestApp {
    pub server: MockServer,
    pub store: Arc<SqliteStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub sleeper: Arc<RecordingSleeper>,
    _dir: TempDir,
}

/// Mock shop plus a file-backed store in a temporary directory.
pub async fn spawn_app() -> anyhow::Result<TestApp> {
    let dir = tempfile::tempdir()?;
    let database = DatabaseConfig {
        path: dir.path().join("sniper.sqlite").to_string_lossy().to_string(),
        max_connections: 1,
    };

    Ok(TestApp {
        server: MockServer::start().await,
        store: Arc::new(SqliteStore::open(&database).await?),
        notifier: Arc::new(RecordingNotifier::default()),
        sleeper: Arc::new(RecordingSleeper::new()),
        _dir: dir,
    })
}

impl TestApp {
    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.server.uri(), route)
    }

    pub fn search(&self, route: &str, keywords: &[&str], threshold: Option<f64>) -> SearchDefinition {
        SearchDefinition {
            url: self.url(route),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            provider: "sample".to_string(),
            format: DocumentFormat::Html,
            recipients: vec!["buyer@example.com".to_string()],
            threshold,
        }
    }

    pub fn scheduler(&self, searches: Vec<SearchDefinition>, mode: RunMode) -> anyhow::Result<Scheduler> {
        let fetcher = Fetcher::from_config(&test_scraper_config(), self.sleeper.clone())?;

        Ok(Scheduler::new(
            fetcher,
            ProviderRegistry::with_builtin_providers(),
            self.store.clone(),
            Some(self.notifier.clone()),
            self.sleeper.clone(),
            searches,
            SchedulerSettings {
                request_delay: REQUEST_DELAY,
                snipe_delay: SNIPE_DELAY,
                notifications_enabled: true,
                mode,
            },
        ))
    }

    /// Serves `body` as HTML on `route` until the server is reset.
    pub async fn serve(&self, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .mount(&self.server)
            .await;
    }
}

/// A search result page in the sample shop layout. Each entry is a product
/// name and its route on the mock server.
pub fn search_page(base: &str, products: &[(&str, &str)]) -> String {
    let cards: String = products
        .iter()
        .map(|(name, route)| {
            format!(
                r#"<div class="product"><a class="product-title" href="{}{}?utm_source=search">{}</a></div>"#,
                base, route, name
            )
        })
        .collect();

    format!(
        r#"<html><body><div id="product-container">{}</div></body></html>"#,
        cards
    )
}

pub fn product_page(price: Option<&str>, available: bool) -> String {
    let mut body = String::from("<html><body><h1>Product</h1>");
    if let Some(price) = price {
        body.push_str(&format!(r#"<span id="price">{}</span>"#, price));
    }
    if !available {
        body.push_str(r#"<div id="unavailable">Out of stock</div>"#);
    }
    body.push_str("</body></html>");
    body
}
