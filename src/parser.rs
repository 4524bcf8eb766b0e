//! Parser module for Bitkub market data messages
//!
//! Order book levels travel as untyped positional arrays. Everything that
//! knows which index holds the price and which holds the amount lives here;
//! the rest of the crate only sees [`BookEvent`] and [`PriceLevel`].

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::error::{MarketDataError, Result};
use crate::pair::RawMarketSymbol;

/// Stream event carrying the full book: `[trades, bids, asks]`
pub const FULL_REFRESH_EVENT: &str = "tradeschanged";
/// Stream event carrying bid-side updates
pub const BID_DELTA_EVENT: &str = "bidschanged";
/// Stream event carrying ask-side updates
pub const ASK_DELTA_EVENT: &str = "askschanged";

/// Positions of price and amount inside a wire level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelLayout {
    pub price: usize,
    pub amount: usize,
}

/// `[id, timestamp, volume, price, amount]`, used by REST books and full refreshes
pub const BOOK_ENTRY_LAYOUT: LevelLayout = LevelLayout { price: 3, amount: 4 };

/// `[price, amount]`, used by streamed deltas
pub const DELTA_LAYOUT: LevelLayout = LevelLayout { price: 0, amount: 1 };

/// Price level (price, amount pair). A zero amount removes the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub amount: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }
}

/// Decoded order book stream event
#[derive(Debug, Clone, PartialEq)]
pub enum BookEvent {
    /// Complete bid and ask lists, superseding all prior state
    FullRefresh {
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },
    BidDelta(Vec<PriceLevel>),
    AskDelta(Vec<PriceLevel>),
    /// Any other event name; carries the name for logging
    Unrecognized(String),
}

/// Envelope shared by every stream message
#[derive(Debug, Clone, Deserialize)]
pub struct StreamMessage {
    pub event: String,

    #[serde(default)]
    pub data: Value,

    #[serde(default)]
    pub pairing_id: Option<u64>,
}

impl BookEvent {
    /// Parse a raw stream message
    pub fn parse(raw: &str) -> Result<Self> {
        let message: StreamMessage = serde_json::from_str(raw)?;
        Self::from_message(message)
    }

    fn from_message(message: StreamMessage) -> Result<Self> {
        match message.event.as_str() {
            FULL_REFRESH_EVENT => {
                let sections = message.data.as_array().ok_or_else(|| {
                    MarketDataError::ParseError("full refresh data is not an array".to_string())
                })?;
                if sections.len() < 3 {
                    return Err(MarketDataError::ParseError(format!(
                        "full refresh expects [trades, bids, asks], got {} sections",
                        sections.len()
                    )));
                }
                Ok(BookEvent::FullRefresh {
                    bids: decode_levels(&sections[1], BOOK_ENTRY_LAYOUT)?,
                    asks: decode_levels(&sections[2], BOOK_ENTRY_LAYOUT)?,
                })
            }
            BID_DELTA_EVENT => Ok(BookEvent::BidDelta(decode_levels(&message.data, DELTA_LAYOUT)?)),
            ASK_DELTA_EVENT => Ok(BookEvent::AskDelta(decode_levels(&message.data, DELTA_LAYOUT)?)),
            _ => Ok(BookEvent::Unrecognized(message.event)),
        }
    }
}

/// Decode a JSON array of positional levels
pub fn decode_levels(value: &Value, layout: LevelLayout) -> Result<Vec<PriceLevel>> {
    let entries = value
        .as_array()
        .ok_or_else(|| MarketDataError::ParseError("level list is not an array".to_string()))?;

    entries
        .iter()
        .map(|entry| decode_level(entry, layout))
        .collect()
}

fn decode_level(entry: &Value, layout: LevelLayout) -> Result<PriceLevel> {
    let fields = entry
        .as_array()
        .ok_or_else(|| MarketDataError::ParseError("level is not an array".to_string()))?;

    let field = |index: usize| {
        fields.get(index).ok_or_else(|| {
            MarketDataError::ParseError(format!(
                "level has {} fields, expected index {}",
                fields.len(),
                index
            ))
        })
    };

    let level = PriceLevel {
        price: decode_decimal(field(layout.price)?)?,
        amount: decode_decimal(field(layout.amount)?)?,
    };

    if level.price.is_sign_negative() || level.amount.is_sign_negative() {
        return Err(MarketDataError::ParseError(format!(
            "negative level {} @ {}",
            level.amount, level.price
        )));
    }

    Ok(level)
}

/// Decimal from a JSON number or numeric string
fn decode_decimal(value: &Value) -> Result<Decimal> {
    let text = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Decimal::from(i));
            }
            n.to_string()
        }
        Value::String(s) => s.clone(),
        other => {
            return Err(MarketDataError::ParseError(format!(
                "expected a number, got {}",
                other
            )))
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| MarketDataError::ParseError(format!("invalid decimal {}: {}", text, e)))
}

/// REST envelope: `error` is 0 on success
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub error: i64,
    pub result: Option<T>,
}

/// Symbol directory response body
pub type SymbolsResponse = ApiResponse<Vec<RawMarketSymbol>>;

/// Order book from the REST API
#[derive(Debug, Clone, Deserialize)]
pub struct RestOrderBook {
    #[serde(deserialize_with = "deserialize_book_entries")]
    pub bids: Vec<PriceLevel>,

    #[serde(deserialize_with = "deserialize_book_entries")]
    pub asks: Vec<PriceLevel>,
}

/// Order book response body
pub type BooksResponse = ApiResponse<RestOrderBook>;

/// Custom deserializer for `[id, timestamp, volume, price, amount]` entries
fn deserialize_book_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<PriceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Value = Deserialize::deserialize(deserializer)?;
    decode_levels(&raw, BOOK_ENTRY_LAYOUT).map_err(serde::de::Error::custom)
}
