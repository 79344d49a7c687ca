pub mod emag;
pub mod json;
pub mod sample;

pub use emag::EmagProvider;
pub use json::JsonProvider;
pub use sample::SampleProvider;

use scraper::{ElementRef, Selector};

use crate::models::SearchHit;
use crate::utils::error::{AppError, Result};

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| AppError::InvalidSelector {
        selector: css.to_string(),
    })
}

/// Concatenated text of an element, whitespace trimmed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Drops the query string so the stored URL stays stable between runs.
pub(crate) fn strip_query(href: &str) -> &str {
    href.split('?').next().unwrap_or(href)
}

/// Builds a search hit from the title link inside one result card.
pub(crate) fn hit_from_card(card: ElementRef<'_>, title: &Selector, css: &str) -> Result<SearchHit> {
    let link = card
        .select(title)
        .next()
        .ok_or_else(|| AppError::Scraping(format!("search result without '{}'", css)))?;
    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| AppError::Scraping(format!("'{}' has no href", css)))?;

    Ok(SearchHit {
        name: element_text(link),
        url: strip_query(href).to_string(),
    })
}
