//! Subscription registry
//!
//! Every subscription owns its connections, its channel, and a single task
//! that holds the books and drives the consumer callback. Nothing is shared
//! between subscriptions, even for the same pair.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::metrics::FeedMetrics;
use crate::orderbook::{Aggregator, BookCallback, OrderBookStore};
use crate::pair::TradingPair;
use crate::websocket::{ConnectionHandle, ConnectionManager, FeedEvent, Transport};

/// Opaque token for one active subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(Uuid);

impl SubscriptionHandle {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0.simple())
    }
}

struct Subscription {
    pairs: Vec<TradingPair>,
    connections: Vec<ConnectionHandle>,
    cancel: CancellationToken,
    book_task: JoinHandle<()>,
}

/// Tracks live subscriptions and tears them down on request
pub struct SubscriptionRegistry<T: Transport> {
    connections: ConnectionManager<T>,
    subscriptions: Mutex<HashMap<SubscriptionHandle, Subscription>>,
    metrics: FeedMetrics,
}

impl<T: Transport> SubscriptionRegistry<T> {
    pub fn new(connections: ConnectionManager<T>, metrics: FeedMetrics) -> Self {
        Self {
            connections,
            subscriptions: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Start streaming already-resolved pairs.
    ///
    /// Spawns the book task and one connection per pair, then returns
    /// without waiting for any connection to come up.
    pub fn start(
        &self,
        resolved: BTreeMap<TradingPair, u64>,
        callback: BookCallback,
    ) -> SubscriptionHandle {
        let handle = SubscriptionHandle::generate();
        let cancel = CancellationToken::new();
        let pairs: Vec<TradingPair> = resolved.keys().cloned().collect();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let book_task = tokio::spawn(run_book_task(
            handle,
            events_rx,
            Aggregator::new(pairs.clone(), callback),
            cancel.clone(),
            self.metrics.clone(),
        ));

        let connections = resolved
            .into_iter()
            .map(|(pair, id)| {
                self.connections
                    .open(pair, id, events_tx.clone(), cancel.child_token())
            })
            .collect();

        info!(subscription = %handle, pairs = ?pairs, "Subscribed to order books");

        self.lock().insert(
            handle,
            Subscription {
                pairs,
                connections,
                cancel,
                book_task,
            },
        );

        handle
    }

    /// Close every connection owned by `handle`. Unknown handles are ignored.
    ///
    /// Once this returns the handle's callback will not be invoked again.
    pub async fn stop(&self, handle: &SubscriptionHandle) {
        let removed = self.lock().remove(handle);
        let Some(subscription) = removed else {
            debug!(subscription = %handle, "Unsubscribe for unknown subscription");
            return;
        };

        subscription.cancel.cancel();
        if let Err(e) = subscription.book_task.await {
            warn!(subscription = %handle, error = %e, "Subscription task failed");
        }
        self.connections.close_all(subscription.connections).await;

        info!(subscription = %handle, pairs = ?subscription.pairs, "Unsubscribed from order books");
    }

    /// Stop every live subscription
    pub async fn stop_all(&self) {
        let handles: Vec<SubscriptionHandle> = self.lock().keys().copied().collect();
        for handle in handles {
            self.stop(&handle).await;
        }
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pairs covered by a live subscription
    pub fn pairs(&self, handle: &SubscriptionHandle) -> Option<Vec<TradingPair>> {
        self.lock().get(handle).map(|s| s.pairs.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriptionHandle, Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Single writer for a subscription's books
async fn run_book_task(
    handle: SubscriptionHandle,
    mut events: mpsc::UnboundedReceiver<FeedEvent>,
    mut aggregator: Aggregator,
    cancel: CancellationToken,
    metrics: FeedMetrics,
) {
    let mut store = OrderBookStore::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            event = events.recv() => event,
        };

        let Some(FeedEvent { pair, event }) = next else { break };

        if !store.apply(&pair, &event) {
            continue;
        }
        if cancel.is_cancelled() {
            break;
        }

        aggregator.publish(&store);
        metrics.book_updates.inc();
    }

    debug!(subscription = %handle, books = store.len(), "Subscription task stopped");
}
