//! Order book module
//!
//! Maintains local order book state from Bitkub stream events and renders
//! sorted snapshots for consumers.

mod aggregator;
mod book;
mod store;

pub use aggregator::{render, Aggregator, BookCallback};
pub use book::{LocalOrderBook, SideBook};
pub use store::OrderBookStore;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pair::TradingPair;
pub use crate::parser::PriceLevel;

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

/// Read-only rendering of one pair's book.
///
/// Bids are sorted by descending price, asks by ascending price.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

/// Rendered books for every pair of a subscription that has data
pub type OrderBooks = BTreeMap<TradingPair, OrderBookSnapshot>;

impl OrderBookSnapshot {
    /// Get best bid level
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Get best ask level
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Get mid price
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::from(2)),
            _ => None,
        }
    }

    /// Get spread in basis points
    pub fn spread_bps(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask(), self.mid_price()) {
            (Some(bid), Some(ask), Some(mid)) if mid > Decimal::ZERO => {
                Some((ask.price - bid.price) / mid * Decimal::from(10000))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_top_of_book() {
        let snapshot = OrderBookSnapshot {
            bids: vec![
                PriceLevel::new(dec!(99), dec!(1)),
                PriceLevel::new(dec!(98), dec!(2)),
            ],
            asks: vec![PriceLevel::new(dec!(101), dec!(1))],
        };

        assert_eq!(snapshot.best_bid().map(|l| l.price), Some(dec!(99)));
        assert_eq!(snapshot.best_ask().map(|l| l.price), Some(dec!(101)));
        assert_eq!(snapshot.mid_price(), Some(dec!(100)));
        assert_eq!(snapshot.spread_bps(), Some(dec!(200)));
    }

    #[test]
    fn test_one_sided_book_has_no_mid() {
        let snapshot = OrderBookSnapshot {
            bids: vec![PriceLevel::new(dec!(99), dec!(1))],
            asks: vec![],
        };
        assert!(snapshot.mid_price().is_none());
        assert!(snapshot.spread_bps().is_none());
    }
}
