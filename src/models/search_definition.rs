use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::models::{DocumentFormat, NewTrackedItem, SearchHit};

pub fn default_provider() -> String {
    "sample".to_string()
}

/// A configured discovery query: a search endpoint plus the keywords a hit
/// must contain to become tracked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SearchDefinition {
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub format: DocumentFormat,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl SearchDefinition {
    /// Case-insensitive substring match; every keyword must be present.
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.keywords
            .iter()
            .all(|keyword| lower.contains(&keyword.to_lowercase()))
    }

    /// Keeps the hits that pass the keyword filter and attaches this
    /// definition's routing to each of them, preserving document order.
    /// Relative hit links are resolved against the search URL.
    pub fn select(&self, hits: Vec<SearchHit>) -> Vec<NewTrackedItem> {
        let base = Url::parse(&self.url).ok();
        hits.into_iter()
            .filter(|hit| self.matches(&hit.name))
            .map(|hit| NewTrackedItem {
                url: resolve_link(base.as_ref(), hit.url),
                name: hit.name,
                provider: self.provider.clone(),
                format: self.format,
                recipients: self.recipients.clone(),
                threshold: self.threshold,
            })
            .collect()
    }
}

fn resolve_link(base: Option<&Url>, href: String) -> String {
    match base.map(|base| base.join(&href)) {
        Some(Ok(mut resolved)) => {
            resolved.set_query(None);
            resolved.set_fragment(None);
            resolved.into()
        }
        _ => href,
    }
}
