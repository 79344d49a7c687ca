use crate::fetcher::Document;
use crate::models::{ScrapeObservation, SearchHit};
use crate::utils::error::Result;

/// Translates one source's documents into the common shape.
///
/// Adapters are pure: they never fetch, and they must report missing page
/// structure as an error rather than an empty result. An empty search page
/// that still has the expected structure yields `Ok(vec![])`.
pub trait ProviderAdapter: Send + Sync {
    /// Identifier used in configuration, lowercase.
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Every product summary on a search page, in document order.
    fn scrape_search(&self, doc: &Document) -> Result<Vec<SearchHit>>;

    /// Availability and, when it can be read, price of one product page.
    fn scrape_data(&self, doc: &Document) -> Result<ScrapeObservation>;
}
