//! Public client API
//!
//! Ties the REST directory, the pair resolver and the subscription registry
//! together behind the operations consumers call.

use futures_util::future::try_join_all;
use std::collections::BTreeMap;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::metrics::FeedMetrics;
use crate::orderbook::OrderBooks;
use crate::pair::{self, MarketSymbols, TradingPair};
use crate::rest::{MarketDataApi, RestClient};
use crate::subscription::{SubscriptionHandle, SubscriptionRegistry};
use crate::websocket::{ConnectionManager, Transport, WsTransport};

/// Bitkub market data client
pub struct BitkubClient<A: MarketDataApi = RestClient, T: Transport = WsTransport> {
    api: A,
    registry: SubscriptionRegistry<T>,
    metrics: FeedMetrics,
}

impl BitkubClient {
    /// Client for the configured REST and WebSocket endpoints
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_parts(RestClient::new(&config.base_url), WsTransport, &config.ws_base_url)
    }
}

impl<A: MarketDataApi, T: Transport> BitkubClient<A, T> {
    /// Client over an explicit API and transport
    pub fn with_parts(api: A, transport: T, ws_base_url: &str) -> Result<Self> {
        let metrics = FeedMetrics::new()?;
        let connections = ConnectionManager::new(transport, ws_base_url, metrics.clone());

        Ok(Self {
            api,
            registry: SubscriptionRegistry::new(connections, metrics.clone()),
            metrics,
        })
    }

    /// Symbol directory keyed by external pair name
    pub async fn list_pairs(&self) -> Result<MarketSymbols> {
        self.api.market_symbols().await
    }

    /// One-shot order books for several pairs, fetched concurrently
    pub async fn fetch_order_books(
        &self,
        pairs: &[TradingPair],
        limit: Option<u32>,
    ) -> Result<OrderBooks> {
        let books = try_join_all(pairs.iter().map(|pair| async move {
            let book = self.api.order_book(pair, limit).await?;
            Ok::<_, crate::error::MarketDataError>((pair.clone(), book))
        }))
        .await?;

        Ok(books.into_iter().collect())
    }

    /// Map each pair to its exchange identifier.
    ///
    /// Fails with `SymbolNotFound` naming the first pair absent from the directory.
    pub async fn resolve_pairs(&self, pairs: &[TradingPair]) -> Result<BTreeMap<TradingPair, u64>> {
        let directory = self.api.market_symbols().await?;
        pair::resolve_pairs(&directory, pairs)
    }

    /// Stream live order books for `pairs`.
    ///
    /// `callback` receives every pair with data each time any of their books
    /// changes. Resolution failures are returned before any connection opens.
    pub async fn subscribe<F>(&self, pairs: &[TradingPair], callback: F) -> Result<SubscriptionHandle>
    where
        F: FnMut(OrderBooks) + Send + 'static,
    {
        let resolved = self.resolve_pairs(pairs).await?;
        info!(pairs = ?resolved, "Resolved pairs");
        Ok(self.registry.start(resolved, Box::new(callback)))
    }

    /// Tear down a subscription. Unknown handles are ignored.
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        self.registry.stop(handle).await;
    }

    /// Tear down every live subscription
    pub async fn unsubscribe_all(&self) {
        self.registry.stop_all().await;
    }

    /// Number of live subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.registry.len()
    }

    pub fn metrics(&self) -> &FeedMetrics {
        &self.metrics
    }
}
