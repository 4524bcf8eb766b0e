//! Per-pair order book state
//!
//! Owned by a single subscription task; no locking.

use std::collections::HashMap;
use tracing::trace;

use super::{LocalOrderBook, OrderBookSnapshot, PriceLevel, Side};
use crate::pair::TradingPair;
use crate::parser::BookEvent;

/// Local books for the pairs of one subscription
#[derive(Debug, Default)]
pub struct OrderBookStore {
    books: HashMap<TradingPair, LocalOrderBook>,
}

impl OrderBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a decoded stream event. Returns true if state changed.
    pub fn apply(&mut self, pair: &TradingPair, event: &BookEvent) -> bool {
        match event {
            BookEvent::FullRefresh { bids, asks } => {
                self.apply_full_refresh(pair, bids, asks);
                true
            }
            BookEvent::BidDelta(updates) => self.apply_bid_delta(pair, updates),
            BookEvent::AskDelta(updates) => self.apply_ask_delta(pair, updates),
            BookEvent::Unrecognized(_) => false,
        }
    }

    /// Replace both sides of a pair's book
    pub fn apply_full_refresh(&mut self, pair: &TradingPair, bids: &[PriceLevel], asks: &[PriceLevel]) {
        self.books
            .insert(pair.clone(), LocalOrderBook::from_levels(bids, asks));
    }

    /// Merge bid updates. No-op until the pair has had a full refresh.
    pub fn apply_bid_delta(&mut self, pair: &TradingPair, updates: &[PriceLevel]) -> bool {
        self.apply_delta(pair, Side::Bid, updates)
    }

    /// Merge ask updates. No-op until the pair has had a full refresh.
    pub fn apply_ask_delta(&mut self, pair: &TradingPair, updates: &[PriceLevel]) -> bool {
        self.apply_delta(pair, Side::Ask, updates)
    }

    fn apply_delta(&mut self, pair: &TradingPair, side: Side, updates: &[PriceLevel]) -> bool {
        match self.books.get_mut(pair) {
            Some(book) => book.apply_delta(side, updates),
            None => {
                trace!(pair = %pair, side = ?side, "Delta before full refresh, dropping");
                false
            }
        }
    }

    pub fn get(&self, pair: &TradingPair) -> Option<&LocalOrderBook> {
        self.books.get(pair)
    }

    /// Render a single pair
    pub fn snapshot(&self, pair: &TradingPair) -> Option<OrderBookSnapshot> {
        self.books.get(pair).map(LocalOrderBook::snapshot)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc() -> TradingPair {
        TradingPair::new("BTC", "THB")
    }

    #[test]
    fn test_delta_without_refresh_is_dropped() {
        let mut store = OrderBookStore::new();
        assert!(!store.apply_bid_delta(&btc(), &[PriceLevel::new(dec!(1), dec!(1))]));
        assert!(store.is_empty());
    }

    #[test]
    fn test_full_refresh_replaces_state() {
        let mut store = OrderBookStore::new();
        store.apply_full_refresh(
            &btc(),
            &[PriceLevel::new(dec!(100), dec!(1)), PriceLevel::new(dec!(99), dec!(1))],
            &[PriceLevel::new(dec!(101), dec!(1))],
        );
        store.apply_bid_delta(&btc(), &[PriceLevel::new(dec!(98), dec!(5))]);

        let refresh = BookEvent::FullRefresh {
            bids: vec![PriceLevel::new(dec!(97), dec!(2))],
            asks: vec![],
        };
        assert!(store.apply(&btc(), &refresh));

        let snapshot = store.snapshot(&btc()).unwrap();
        assert_eq!(snapshot.bids, vec![PriceLevel::new(dec!(97), dec!(2))]);
        assert!(snapshot.asks.is_empty());
    }

    #[test]
    fn test_unrecognized_event_changes_nothing() {
        let mut store = OrderBookStore::new();
        assert!(!store.apply(&btc(), &BookEvent::Unrecognized("ticker".to_string())));
        assert!(store.get(&btc()).is_none());
    }

    #[test]
    fn test_refresh_then_delta_removes_top_bid() {
        let mut store = OrderBookStore::new();
        store.apply_full_refresh(
            &btc(),
            &[PriceLevel::new(dec!(10000), dec!(0.5)), PriceLevel::new(dec!(9999), dec!(0.3))],
            &[],
        );
        assert!(store.apply(&btc(), &BookEvent::BidDelta(vec![PriceLevel::new(dec!(10000), dec!(0))])));

        let snapshot = store.snapshot(&btc()).unwrap();
        assert_eq!(snapshot.bids, vec![PriceLevel::new(dec!(9999), dec!(0.3))]);
    }
}
