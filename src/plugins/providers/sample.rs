use crate::fetcher::Document;
use crate::models::{ScrapeObservation, SearchHit};
use crate::plugins::price::parse_price;
use crate::plugins::providers::{element_text, hit_from_card, selector};
use crate::plugins::traits::ProviderAdapter;
use crate::utils::error::{AppError, Result};

const CONTAINER: &str = "#product-container";
const CARD: &str = "#product-container > .product";
const TITLE: &str = ".product-title";
const UNAVAILABLE: &str = "#unavailable";
const PRICE: &str = "#price";

/// Reference provider for a minimal shop layout. Copy it when adding a
/// new source.
#[derive(Debug, Default)]
pub struct SampleProvider;

impl SampleProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderAdapter for SampleProvider {
    fn name(&self) -> &str {
        "sample"
    }

    fn description(&self) -> &str {
        "Sample shop layout with #price and #unavailable markers"
    }

    fn scrape_search(&self, doc: &Document) -> Result<Vec<SearchHit>> {
        let html = doc.as_html()?.parse();

        if html.select(&selector(CONTAINER)?).next().is_none() {
            return Err(AppError::Scraping(format!("'{}' not found", CONTAINER)));
        }

        let card = selector(CARD)?;
        let title = selector(TITLE)?;
        let hits = html
            .select(&card)
            .map(|card| hit_from_card(card, &title, TITLE))
            .collect::<Result<Vec<_>>>()?;
        Ok(hits)
    }

    fn scrape_data(&self, doc: &Document) -> Result<ScrapeObservation> {
        let html = doc.as_html()?.parse();

        let unavailable = selector(UNAVAILABLE)?;
        let price = selector(PRICE)?;

        let available = html.select(&unavailable).next().is_none();
        let price = html
            .select(&price)
            .next()
            .map(element_text)
            .and_then(|text| parse_price(&text));

        Ok(ScrapeObservation { available, price })
    }
}
