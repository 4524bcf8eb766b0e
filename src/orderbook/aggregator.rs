//! Renders a subscription's books and hands them to the consumer

use tracing::trace;

use super::{OrderBookStore, OrderBooks};
use crate::pair::TradingPair;

/// Consumer callback, invoked with every pair of the subscription that has data
pub type BookCallback = Box<dyn FnMut(OrderBooks) + Send + 'static>;

/// Render every pair of the group that has a book. Pairs without data are omitted.
pub fn render(pairs: &[TradingPair], store: &OrderBookStore) -> OrderBooks {
    pairs
        .iter()
        .filter_map(|pair| store.snapshot(pair).map(|snapshot| (pair.clone(), snapshot)))
        .collect()
}

/// Delivers rendered books for one subscription
pub struct Aggregator {
    pairs: Vec<TradingPair>,
    callback: BookCallback,
}

impl Aggregator {
    pub fn new(pairs: Vec<TradingPair>, callback: BookCallback) -> Self {
        Self { pairs, callback }
    }

    pub fn pairs(&self) -> &[TradingPair] {
        &self.pairs
    }

    /// Render the group and invoke the callback once
    pub fn publish(&mut self, store: &OrderBookStore) {
        let books = render(&self.pairs, store);
        trace!(pairs = books.len(), "Publishing order books");
        (self.callback)(books);
    }
}
