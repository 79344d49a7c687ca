use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::fetcher::Fetcher;
use crate::models::{format_price, SearchDefinition, TrackedItem};
use crate::plugins::registry::ProviderRegistry;
use crate::plugins::traits::Notifier;
use crate::storage::{Store, UpsertSummary};
use crate::tracker::{self, NotificationGate, NotificationIntent, Suppression, Transition};
use crate::utils::error::Result;
use crate::utils::sleeper::Sleeper;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Discover and snipe forever.
    Continuous,
    /// Run one full cycle to record every item's current state, then stop.
    /// Nothing is sent.
    Populate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    pub request_delay: Duration,
    pub snipe_delay: Duration,
    pub notifications_enabled: bool,
    pub mode: RunMode,
}

impl SchedulerSettings {
    pub fn from_config(config: &AppConfig, mode: RunMode) -> Self {
        Self {
            request_delay: Duration::from_millis(config.scraper.request_delay_ms),
            snipe_delay: Duration::from_millis(config.scraper.snipe_delay_ms),
            notifications_enabled: config.notifications.enabled,
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Delivery {
    Sent,
    Suppressed(Suppression),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnipeOutcome {
    pub transition: Transition,
    /// The item as persisted after this check.
    pub item: TrackedItem,
    pub delivery: Option<Delivery>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub searches_run: usize,
    pub searches_failed: usize,
    pub items_inserted: usize,
    pub items_updated: usize,
    pub items_checked: usize,
    pub items_failed: usize,
    pub state_changes: usize,
    pub notifications_sent: usize,
    pub notifications_suppressed: usize,
    pub notifications_failed: usize,
    pub elapsed_ms: u64,
}

impl CycleReport {
    fn record_delivery(&mut self, delivery: &Delivery) {
        match delivery {
            Delivery::Sent => self.notifications_sent += 1,
            Delivery::Suppressed(_) => self.notifications_suppressed += 1,
            Delivery::Failed(_) => self.notifications_failed += 1,
        }
    }
}

/// Sequential poll loop: discovery for every search, then a snipe of every
/// stored item, then a pause. Only one request is ever in flight.
pub struct Scheduler {
    fetcher: Fetcher,
    registry: ProviderRegistry,
    store: Arc<dyn Store>,
    notifier: Option<Arc<dyn Notifier>>,
    sleeper: Arc<dyn Sleeper>,
    searches: Vec<SearchDefinition>,
    settings: SchedulerSettings,
}

impl Scheduler {
    pub fn new(
        fetcher: Fetcher,
        registry: ProviderRegistry,
        store: Arc<dyn Store>,
        notifier: Option<Arc<dyn Notifier>>,
        sleeper: Arc<dyn Sleeper>,
        searches: Vec<SearchDefinition>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            fetcher,
            registry,
            store,
            notifier,
            sleeper,
            searches,
            settings,
        }
    }

    pub fn gate(&self) -> NotificationGate {
        NotificationGate::new(
            self.settings.notifications_enabled,
            self.settings.mode == RunMode::Populate,
        )
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Runs cycles until `max_cycles` is reached, or forever when `None`.
    /// Populate mode always stops after its single cycle.
    /// Returns the number of completed cycles.
    pub async fn run(&self, max_cycles: Option<u64>) -> u64 {
        tracing::info!(
            mode = ?self.settings.mode,
            searches = self.searches.len(),
            "Scheduler started"
        );

        let mut cycle = 0;
        loop {
            cycle += 1;
            let report = self.run_cycle(cycle).await;
            tracing::info!(
                cycle = report.cycle,
                searches = report.searches_run,
                searches_failed = report.searches_failed,
                inserted = report.items_inserted,
                updated = report.items_updated,
                checked = report.items_checked,
                failed = report.items_failed,
                changes = report.state_changes,
                sent = report.notifications_sent,
                elapsed_ms = report.elapsed_ms,
                "Cycle complete"
            );

            if self.settings.mode == RunMode::Populate {
                tracing::info!("Database populated");
                return cycle;
            }
            if max_cycles.is_some_and(|max| cycle >= max) {
                return cycle;
            }

            self.sleeper.sleep(self.settings.snipe_delay).await;
        }
    }

    pub async fn run_cycle(&self, cycle: u64) -> CycleReport {
        let started = tokio::time::Instant::now();
        let mut report = CycleReport {
            cycle,
            started_at: Some(Utc::now()),
            ..CycleReport::default()
        };

        self.discover_all(&mut report).await;
        self.snipe_all(&mut report).await;

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        report
    }

    async fn discover_all(&self, report: &mut CycleReport) {
        for search in &self.searches {
            report.searches_run += 1;
            match self.discover(search).await {
                Ok(summary) => {
                    report.items_inserted += summary.inserted;
                    report.items_updated += summary.updated;
                }
                Err(e) if e.is_fetch_failure() => {
                    report.searches_failed += 1;
                    tracing::warn!(phase = "discovery", url = %search.url, provider = %search.provider, error = %e, "Search page unreachable");
                }
                Err(e) => {
                    report.searches_failed += 1;
                    tracing::error!(phase = "discovery", url = %search.url, provider = %search.provider, error = %e, "Search failed");
                }
            }
        }
    }

    /// Fetches one search page and merges the keyword-matching hits.
    pub async fn discover(&self, search: &SearchDefinition) -> Result<UpsertSummary> {
        let adapter = self.registry.resolve(&search.provider).await?;

        let fetched = self.fetcher.fetch(&search.url, search.format).await;
        self.sleeper.sleep(self.settings.request_delay).await;

        let hits = adapter.scrape_search(&fetched?)?;
        let found = hits.len();
        let selected = search.select(hits);
        tracing::debug!(
            url = %search.url,
            found,
            matched = selected.len(),
            "Search scraped"
        );

        self.store.upsert_many(&selected).await
    }

    async fn snipe_all(&self, report: &mut CycleReport) {
        let items = match self.store.get_all().await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(phase = "snipe", error = %e, "Failed to list tracked items");
                return;
            }
        };

        for item in &items {
            report.items_checked += 1;
            match self.snipe(item).await {
                Ok(outcome) => {
                    if !matches!(
                        outcome.transition,
                        Transition::Unchanged | Transition::PriceUnreadable { .. }
                    ) {
                        report.state_changes += 1;
                    }
                    if let Some(delivery) = &outcome.delivery {
                        report.record_delivery(delivery);
                    }
                }
                Err(e) if e.is_fetch_failure() => {
                    report.items_failed += 1;
                    tracing::warn!(item = %item.name, phase = "snipe", url = %item.url, error = %e, "Product page unreachable");
                }
                Err(e) => {
                    report.items_failed += 1;
                    tracing::error!(item = %item.name, phase = "snipe", provider = %item.provider, error = %e, "Snipe failed");
                }
            }
        }
    }

    /// Re-checks one item, persists any transition, then notifies.
    pub async fn snipe(&self, item: &TrackedItem) -> Result<SnipeOutcome> {
        let adapter = self.registry.resolve(&item.provider).await?;

        let fetched = self.fetcher.fetch(&item.url, item.format).await;
        self.sleeper.sleep(self.settings.request_delay).await;

        let observation = adapter.scrape_data(&fetched?)?;
        let mut decision = tracker::evaluate(item, &observation, self.gate());

        if let Some(update) = decision.update {
            self.store
                .update_price_and_status(&item.name, update.price, update.status)
                .await?;
            metrics::counter!("sniper_state_changes_total").increment(1);
        }

        match decision.transition {
            Transition::BecameAvailable { price } => tracing::info!(
                item = %item.name,
                price = %format_price(price),
                "Product is now available"
            ),
            Transition::PriceChanged { old, new } => tracing::info!(
                item = %item.name,
                old = %format_price(old),
                new = %format_price(Some(new)),
                "Product price changed"
            ),
            Transition::BecameUnavailable => {
                tracing::warn!(item = %item.name, "Product is no longer available")
            }
            Transition::PriceUnreadable { stored } => tracing::warn!(
                item = %item.name,
                stored = %format_price(Some(stored)),
                "Failed to read price; keeping stored value"
            ),
            Transition::Unchanged => tracing::debug!(item = %item.name, "No change"),
        }

        let delivery = match decision.intent.take() {
            Some(intent) => Some(self.deliver(intent).await),
            None => None,
        };

        Ok(SnipeOutcome {
            transition: decision.transition,
            item: decision.apply(item, Utc::now()),
            delivery,
        })
    }

    async fn deliver(&self, intent: NotificationIntent) -> Delivery {
        if let Some(reason) = intent.suppressed {
            tracing::debug!(item = %intent.context.name, kind = %intent.kind, ?reason, "Notification suppressed");
            return Delivery::Suppressed(reason);
        }

        let Some(notifier) = &self.notifier else {
            return Delivery::Suppressed(Suppression::NotificationsDisabled);
        };

        match notifier
            .dispatch(intent.kind, &intent.context, &intent.recipients)
            .await
        {
            Ok(_) => Delivery::Sent,
            Err(e) => {
                tracing::error!(item = %intent.context.name, phase = "notify", kind = %intent.kind, error = %e, "Failed to send notification");
                Delivery::Failed(e.to_string())
            }
        }
    }
}
