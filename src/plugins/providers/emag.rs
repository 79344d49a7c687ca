use crate::fetcher::Document;
use crate::models::{ScrapeObservation, SearchHit};
use crate::plugins::price::parse_price;
use crate::plugins::providers::{hit_from_card, selector};
use crate::plugins::traits::ProviderAdapter;
use crate::utils::error::{AppError, Result};

const GRID: &str = "#card_grid";
const CARD: &str = "#card_grid > .card-item";
const TITLE: &str = ".card-v2-title";
const UNAVAILABLE: &str = ".label-unavailable";
// The detailed price block renders "<old> <currency> <discount> ... <new>";
// the fifth token is the current price.
const DETAILED_PRICE: &str = ".mrg-btm-none.font-size-md.product-new-price";
const DETAILED_PRICE_TOKEN: usize = 4;
const PRICE: &str = ".product-new-price";

#[derive(Debug, Default)]
pub struct EmagProvider;

impl EmagProvider {
    pub fn new() -> Self {
        Self
    }
}

fn joined_text(html: &scraper::Html, css: &str) -> Result<Option<String>> {
    let selector = selector(css)?;
    let mut matches = html.select(&selector).peekable();
    if matches.peek().is_none() {
        return Ok(None);
    }
    Ok(Some(matches.flat_map(|element| element.text()).collect()))
}

impl ProviderAdapter for EmagProvider {
    fn name(&self) -> &str {
        "emag"
    }

    fn description(&self) -> &str {
        "eMAG product grid and product page layout"
    }

    fn scrape_search(&self, doc: &Document) -> Result<Vec<SearchHit>> {
        let html = doc.as_html()?.parse();

        if html.select(&selector(GRID)?).next().is_none() {
            return Err(AppError::Scraping(format!("'{}' not found", GRID)));
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

        let available = html.select(&selector(UNAVAILABLE)?).next().is_none();

        let token = match joined_text(&html, DETAILED_PRICE)? {
            Some(text) => text.split(' ').nth(DETAILED_PRICE_TOKEN).map(str::to_string),
            None => joined_text(&html, PRICE)?
                .and_then(|text| text.split(' ').next().map(str::to_string)),
        };
        let price = token.as_deref().and_then(parse_price);

        Ok(ScrapeObservation { available, price })
    }
}
