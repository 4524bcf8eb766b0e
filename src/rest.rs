//! REST client for the Bitkub public market endpoints
//!
//! Only the two calls the order book engine needs: the symbol directory
//! and one-shot order book snapshots.

use std::future::Future;
use tracing::{debug, info};

use crate::error::{MarketDataError, Result};
use crate::orderbook::{LocalOrderBook, OrderBookSnapshot};
use crate::pair::{normalize_directory, MarketSymbols, TradingPair};
use crate::parser::{BooksResponse, SymbolsResponse};

/// Request/response market data the subscription engine depends on
pub trait MarketDataApi: Send + Sync + 'static {
    /// Fetch the symbol directory, keyed by external pair name
    fn market_symbols(&self) -> impl Future<Output = Result<MarketSymbols>> + Send;

    /// Fetch a one-shot order book for a pair
    fn order_book(
        &self,
        pair: &TradingPair,
        limit: Option<u32>,
    ) -> impl Future<Output = Result<OrderBookSnapshot>> + Send;
}

/// HTTP implementation of [`MarketDataApi`]
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl MarketDataApi for RestClient {
    async fn market_symbols(&self) -> Result<MarketSymbols> {
        let url = format!("{}/api/market/symbols", self.base_url);
        debug!(url = %url, "Fetching market symbols");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                MarketDataError::RestApiError(format!("Failed to fetch market symbols: {}", e))
            })?
            .json::<SymbolsResponse>()
            .await?;

        if response.error != 0 {
            return Err(MarketDataError::RestApiError(format!(
                "Failed to fetch market symbols: error code {}",
                response.error
            )));
        }

        let symbols = normalize_directory(response.result.unwrap_or_default());
        info!(count = symbols.len(), "Market symbols loaded");
        Ok(symbols)
    }

    async fn order_book(&self, pair: &TradingPair, limit: Option<u32>) -> Result<OrderBookSnapshot> {
        let url = format!("{}/api/market/books", self.base_url);
        let symbol = pair.exchange_symbol();

        let mut params = vec![("sym", symbol.to_string())];
        if let Some(limit) = limit {
            params.push(("lmt", limit.to_string()));
        }

        debug!(pair = %pair, sym = %symbol, limit = ?limit, "Fetching order book snapshot");

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)?
            .json::<BooksResponse>()
            .await?;

        if response.error != 0 {
            return Err(MarketDataError::Api {
                pair: pair.clone(),
                code: response.error,
            });
        }

        let book = response.result.ok_or_else(|| {
            MarketDataError::RestApiError(format!("Order book response for {} has no result", pair))
        })?;

        Ok(LocalOrderBook::from_levels(&book.bids, &book.asks).snapshot())
    }
}
