use serde_json::Value;

use crate::fetcher::Document;
use crate::models::{ScrapeObservation, SearchHit};
use crate::plugins::price::price_from_json;
use crate::plugins::providers::strip_query;
use crate::plugins::traits::ProviderAdapter;
use crate::utils::error::{AppError, Result};

const LIST_KEYS: [&str; 2] = ["products", "results"];

/// Generic provider for shops with a JSON API.
///
/// Search documents are an array of `{ "name", "url" }` objects, either at
/// the root or under `products` / `results`. Product documents carry
/// `available` (bool) and `price` (number or shop-formatted string).
#[derive(Debug, Default)]
pub struct JsonProvider;

impl JsonProvider {
    pub fn new() -> Self {
        Self
    }
}

fn hit_list(root: &Value) -> Result<&Vec<Value>> {
    if let Some(list) = root.as_array() {
        return Ok(list);
    }
    LIST_KEYS
        .iter()
        .find_map(|key| root.get(key).and_then(Value::as_array))
        .ok_or_else(|| AppError::Scraping("search document has no product list".to_string()))
}

fn string_field<'a>(entry: &'a Value, field: &str) -> Result<&'a str> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Scraping(format!("search entry without string '{}'", field)))
}

impl ProviderAdapter for JsonProvider {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Generic JSON API with name/url search entries and available/price products"
    }

    fn scrape_search(&self, doc: &Document) -> Result<Vec<SearchHit>> {
        let root = doc.as_json()?;

        hit_list(root)?
            .iter()
            .map(|entry| {
                Ok(SearchHit {
                    name: string_field(entry, "name")?.trim().to_string(),
                    url: strip_query(string_field(entry, "url")?).to_string(),
                })
            })
            .collect()
    }

    fn scrape_data(&self, doc: &Document) -> Result<ScrapeObservation> {
        let root = doc.as_json()?;

        let available = root
            .get("available")
            .and_then(Value::as_bool)
            .ok_or_else(|| AppError::Scraping("product document without boolean 'available'".to_string()))?;
        let price = root.get("price").and_then(price_from_json);

        Ok(ScrapeObservation { available, price })
    }
}
