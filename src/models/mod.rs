use serde::{Deserialize, Serialize};
use std::fmt;

pub mod search_definition;
pub mod tracked_item;

// Re-exports for convenience
pub use search_definition::*;
pub use tracked_item::*;

// Common enums used across models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT")]
pub enum Status {
    #[sqlx(rename = "available")]
    Available,
    #[sqlx(rename = "unavailable")]
    Unavailable,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Available => write!(f, "available"),
            Status::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// How the body of a source URL should be parsed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT")]
pub enum DocumentFormat {
    #[default]
    #[sqlx(rename = "html")]
    Html,
    #[sqlx(rename = "json")]
    Json,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Html => write!(f, "html"),
            DocumentFormat::Json => write!(f, "json"),
        }
    }
}

/// Which message template a notification uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Available,
    Price,
    Unavailable,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Available => "available",
            NotificationKind::Price => "price",
            NotificationKind::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders an optional price the way notifications and logs show it.
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(value) => format!("{:.2}", value),
        None => "???".to_string(),
    }
}
