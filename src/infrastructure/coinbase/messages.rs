//! Coinbase Exchange `matches` channel wire format.

use crate::domain::errors::TradeParseError;
use crate::domain::types::Trade;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Subscription request for the `matches` channel of one product.
pub fn subscribe_message(pair: &str) -> String {
    serde_json::json!({
        "type": "subscribe",
        "channels": [{ "name": "matches", "product_ids": [pair] }]
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[serde(rename = "type")]
    kind: String,
    product_id: Option<String>,
    time: Option<String>,
    price: Option<String>,
    size: Option<String>,
}

/// Parse one inbound frame.
///
/// Returns `Ok(None)` for anything that is not a match on `pair`
/// (subscriptions acks, heartbeats, other products).
pub fn parse_match(text: &str, pair: &str) -> Result<Option<Trade>, TradeParseError> {
    let msg: FeedMessage =
        serde_json::from_str(text).map_err(|e| TradeParseError::Malformed {
            reason: e.to_string(),
        })?;

    if msg.kind != "match" || msg.product_id.as_deref() != Some(pair) {
        return Ok(None);
    }

    let time = msg
        .time
        .ok_or(TradeParseError::MissingField { field: "time" })?;
    let timestamp = DateTime::parse_from_rfc3339(&time)
        .map_err(|_| TradeParseError::InvalidTimestamp { value: time.clone() })?
        .with_timezone(&Utc);

    let price = parse_decimal("price", msg.price)?;
    let size = parse_decimal("size", msg.size)?;

    Ok(Some(Trade::new(timestamp, price, size)))
}

fn parse_decimal(field: &'static str, raw: Option<String>) -> Result<f64, TradeParseError> {
    let raw = raw.ok_or(TradeParseError::MissingField { field })?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(TradeParseError::InvalidNumber { field, value: raw }),
    }
}
