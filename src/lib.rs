//! Bitkub Market Data Client Library
//!
//! Resolves trading pairs against the Bitkub symbol directory, fetches
//! one-shot order books over REST, and keeps local order books in sync with
//! the per-pair WebSocket order book streams.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orderbook;
pub mod pair;
pub mod parser;
pub mod rest;
pub mod subscription;
pub mod websocket;

pub use client::BitkubClient;
pub use config::Config;
pub use error::{MarketDataError, Result};
pub use metrics::FeedMetrics;
pub use orderbook::{OrderBookSnapshot, OrderBookStore, OrderBooks};
pub use pair::{ExchangeSymbol, MarketSymbol, MarketSymbols, TradingPair};
pub use parser::{BookEvent, PriceLevel};
pub use rest::{MarketDataApi, RestClient};
pub use subscription::SubscriptionHandle;
pub use websocket::{FeedConnection, Transport, WsTransport};
