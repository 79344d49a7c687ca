use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

fn price_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\d[\d.,]*").expect("price token pattern is valid"))
}

/// Parses shop-formatted price text where `.` groups thousands and `,` marks
/// decimals, e.g. `"1.299,99 Lei"` -> `1299.99`.
///
/// Returns `None` when no number can be read, never a sentinel value.
pub fn parse_price(text: &str) -> Option<f64> {
    let token = price_token().find(text)?.as_str();
    let normalized = token.replace('.', "").replace(',', ".");
    let normalized = normalized.trim_end_matches('.');

    let value = Decimal::from_str(normalized).ok()?;
    value.to_f64().filter(|price| price.is_finite())
}

/// Reads a JSON price field that may be a number or shop-formatted text.
pub fn price_from_json(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64().filter(|price| price.is_finite()),
        serde_json::Value::String(text) => parse_price(text),
        _ => None,
    }
}
