//! Local order book for a single pair
//!
//! Levels are kept in unordered maps keyed by price; ordering is applied
//! only when a snapshot is rendered.

use rust_decimal::Decimal;
use std::collections::HashMap;

use super::{OrderBookSnapshot, PriceLevel, Side};

/// Price -> amount for one side of a book. Never stores a zero amount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideBook {
    levels: HashMap<Decimal, Decimal>,
}

impl SideBook {
    /// Build a side from a complete level list, skipping zero amounts
    pub fn from_levels(levels: &[PriceLevel]) -> Self {
        let levels = levels
            .iter()
            .filter(|level| !level.amount.is_zero())
            .map(|level| (level.price, level.amount))
            .collect();
        Self { levels }
    }

    /// Apply one update. Returns true if the side changed.
    pub fn update(&mut self, level: &PriceLevel) -> bool {
        if level.amount.is_zero() {
            self.levels.remove(&level.price).is_some()
        } else {
            self.levels.insert(level.price, level.amount) != Some(level.amount)
        }
    }

    /// Apply a batch of updates in order. Returns true if anything changed.
    pub fn update_all(&mut self, levels: &[PriceLevel]) -> bool {
        levels
            .iter()
            .fold(false, |changed, level| self.update(level) || changed)
    }

    /// Amount resting at a price
    pub fn get(&self, price: &Decimal) -> Option<Decimal> {
        self.levels.get(price).copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Levels sorted best-first for the given side
    pub fn sorted(&self, side: Side) -> Vec<PriceLevel> {
        let mut levels: Vec<PriceLevel> = self
            .levels
            .iter()
            .map(|(price, amount)| PriceLevel::new(*price, *amount))
            .collect();
        match side {
            Side::Bid => levels.sort_unstable_by(|a, b| b.price.cmp(&a.price)),
            Side::Ask => levels.sort_unstable_by(|a, b| a.price.cmp(&b.price)),
        }
        levels
    }
}

/// Bid and ask sides for one pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalOrderBook {
    bids: SideBook,
    asks: SideBook,
}

impl LocalOrderBook {
    /// Create a book from a full refresh
    pub fn from_levels(bids: &[PriceLevel], asks: &[PriceLevel]) -> Self {
        Self {
            bids: SideBook::from_levels(bids),
            asks: SideBook::from_levels(asks),
        }
    }

    /// Merge updates into one side. Returns true if the side changed.
    pub fn apply_delta(&mut self, side: Side, updates: &[PriceLevel]) -> bool {
        match side {
            Side::Bid => self.bids.update_all(updates),
            Side::Ask => self.asks.update_all(updates),
        }
    }

    pub fn bids(&self) -> &SideBook {
        &self.bids
    }

    pub fn asks(&self) -> &SideBook {
        &self.asks
    }

    /// Render the sorted snapshot
    pub fn snapshot(&self) -> OrderBookSnapshot {
        OrderBookSnapshot {
            bids: self.bids.sorted(Side::Bid),
            asks: self.asks.sorted(Side::Ask),
        }
    }
}
