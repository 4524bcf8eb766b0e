//! Prometheus metrics for the order book feed
//!
//! Each client owns its own registry so several clients (and tests) can
//! coexist in one process.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::Result;

/// Feed counters shared by a client's connections and subscription tasks
#[derive(Clone)]
pub struct FeedMetrics {
    registry: Registry,
    pub messages: IntCounterVec,
    pub decode_errors: IntCounterVec,
    pub book_updates: IntCounter,
    pub active_connections: IntGauge,
}

impl FeedMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let messages = IntCounterVec::new(
            Opts::new("bitkub_feed_messages_total", "Stream messages received"),
            &["pair"],
        )?;
        let decode_errors = IntCounterVec::new(
            Opts::new("bitkub_feed_decode_errors_total", "Stream messages dropped as malformed"),
            &["pair"],
        )?;
        let book_updates = IntCounter::new(
            "bitkub_feed_book_updates_total",
            "Rendered order book updates delivered to consumers",
        )?;
        let active_connections = IntGauge::new(
            "bitkub_feed_active_connections",
            "Open order book stream connections",
        )?;

        registry.register(Box::new(messages.clone()))?;
        registry.register(Box::new(decode_errors.clone()))?;
        registry.register(Box::new(book_updates.clone()))?;
        registry.register(Box::new(active_connections.clone()))?;

        Ok(Self {
            registry,
            messages,
            decode_errors,
            book_updates,
            active_connections,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every metric in the registry
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
