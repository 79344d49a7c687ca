use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{DocumentFormat, Status};

/// A monitored product as persisted in the store. `name` is the key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedItem {
    pub name: String,
    pub url: String,
    pub provider: String,
    pub format: DocumentFormat,
    pub price: Option<f64>,
    pub status: Status,
    pub recipients: Vec<String>,
    pub threshold: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity and routing of a product, as produced by discovery or seeded
/// from configuration. Carries no availability state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct NewTrackedItem {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(url)]
    pub url: String,
    #[serde(default = "crate::models::default_provider")]
    pub provider: String,
    #[serde(default)]
    pub format: DocumentFormat,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl NewTrackedItem {
    /// Whether merging this entry over `stored` would overwrite it.
    /// Only url, provider and recipients count; price and status never do.
    pub fn differs_from(&self, stored: &TrackedItem) -> bool {
        self.url != stored.url
            || !self.provider.eq_ignore_ascii_case(&stored.provider)
            || self.recipients != stored.recipients
    }

    pub fn into_tracked(self, now: DateTime<Utc>) -> TrackedItem {
        TrackedItem {
            name: self.name,
            url: self.url,
            provider: self.provider,
            format: self.format,
            price: None,
            status: Status::Unavailable,
            recipients: self.recipients,
            threshold: self.threshold,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One product summary found on a search page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub name: String,
    pub url: String,
}

/// What a single product page said at fetch time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScrapeObservation {
    pub available: bool,
    pub price: Option<f64>,
}

impl ScrapeObservation {
    pub fn available(price: Option<f64>) -> Self {
        Self {
            available: true,
            price,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            price: None,
        }
    }
}
