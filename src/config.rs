//! Configuration module for the market data client

use serde::Deserialize;
use std::env;

use crate::error::{MarketDataError, Result};
use crate::pair::TradingPair;

const DEFAULT_BASE_URL: &str = "https://api.bitkub.com";
const DEFAULT_WS_URL: &str = "wss://api.bitkub.com/websocket-api";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// REST API base URL
    pub base_url: String,

    /// WebSocket base URL; order book streams live under `/orderbook/{id}`
    pub ws_base_url: String,

    /// Trading pairs the binary subscribes to (e.g., ["BTC_THB", "ETH_THB"])
    pub symbols: Vec<TradingPair>,

    /// Optional depth limit for one-shot REST snapshots
    pub snapshot_limit: Option<u32>,

    /// Port for the health and metrics server
    pub health_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let symbols = env::var("SYMBOLS")
            .unwrap_or_else(|_| "BTC_THB".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<TradingPair>>>()?;

        let snapshot_limit = match env::var("SNAPSHOT_LIMIT") {
            Ok(raw) => Some(raw.trim().parse().map_err(|_| {
                MarketDataError::ConfigError(format!("SNAPSHOT_LIMIT is not a number: {}", raw))
            })?),
            Err(_) => None,
        };

        Ok(Self {
            base_url: env::var("BITKUB_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            ws_base_url: env::var("BITKUB_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string()),
            symbols,
            snapshot_limit,
            health_port: env::var("HEALTH_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()
                .unwrap_or(9090),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_base_url: DEFAULT_WS_URL.to_string(),
            symbols: vec![TradingPair::new("BTC", "THB")],
            snapshot_limit: None,
            health_port: 9090,
        }
    }
}
