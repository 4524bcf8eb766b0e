//! Stream connection manager
//!
//! Opens one connection task per pair. Each task decodes its messages and
//! forwards them, in arrival order, onto the owning subscription's channel.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{FeedConnection, Transport};
use crate::metrics::FeedMetrics;
use crate::pair::TradingPair;
use crate::parser::BookEvent;

/// A decoded event tagged with the pair whose connection produced it
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub pair: TradingPair,
    pub event: BookEvent,
}

/// A running stream connection
#[derive(Debug)]
pub struct ConnectionHandle {
    pair: TradingPair,
    url: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// True once the connection task has exited
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }
}

/// Opens and closes order book stream connections
pub struct ConnectionManager<T: Transport> {
    transport: Arc<T>,
    ws_base_url: String,
    metrics: FeedMetrics,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T, ws_base_url: &str, metrics: FeedMetrics) -> Self {
        Self {
            transport: Arc::new(transport),
            ws_base_url: ws_base_url.trim_end_matches('/').to_string(),
            metrics,
        }
    }

    /// Stream address for a pair's numeric identifier
    pub fn stream_url(&self, id: u64) -> String {
        format!("{}/orderbook/{}", self.ws_base_url, id)
    }

    /// Spawn a connection for `pair`, delivering decoded events to `sink`.
    ///
    /// The connection is established inside the task; this never blocks.
    pub fn open(
        &self,
        pair: TradingPair,
        id: u64,
        sink: mpsc::UnboundedSender<FeedEvent>,
        cancel: CancellationToken,
    ) -> ConnectionHandle {
        let url = self.stream_url(id);
        let task = tokio::spawn(run_connection(
            self.transport.clone(),
            pair.clone(),
            url.clone(),
            sink,
            cancel.clone(),
            self.metrics.clone(),
        ));

        ConnectionHandle {
            pair,
            url,
            cancel,
            task,
        }
    }

    /// Close every connection in a group and wait for their tasks to exit.
    ///
    /// Connections that already ended are skipped over.
    pub async fn close_all(&self, handles: Vec<ConnectionHandle>) {
        for handle in &handles {
            handle.cancel.cancel();
        }
        for handle in handles {
            if let Err(e) = handle.task.await {
                warn!(pair = %handle.pair, error = %e, "Connection task failed");
            }
        }
    }
}

async fn run_connection<T: Transport>(
    transport: Arc<T>,
    pair: TradingPair,
    url: String,
    sink: mpsc::UnboundedSender<FeedEvent>,
    cancel: CancellationToken,
    metrics: FeedMetrics,
) {
    info!(pair = %pair, url = %url, "Opening order book stream");

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = transport.open(&url) => result,
    };

    let mut connection = match opened {
        Ok(connection) => connection,
        Err(e) => {
            warn!(pair = %pair, url = %url, error = %e, "Failed to open order book stream");
            return;
        }
    };
    metrics.active_connections.inc();
    let label = pair.to_string();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            message = connection.recv() => Some(message),
        };

        let Some(message) = next else { break };

        match message {
            Ok(Some(text)) => {
                metrics.messages.with_label_values(&[label.as_str()]).inc();
                if !forward(&pair, &text, &sink, &metrics) {
                    debug!(pair = %pair, "Subscription gone, stopping stream");
                    break;
                }
            }
            Ok(None) => continue,
            Err(e) => {
                warn!(pair = %pair, error = %e, "Order book stream lost");
                break;
            }
        }
    }

    connection.close().await;
    metrics.active_connections.dec();
    info!(pair = %pair, "Order book stream closed");
}

/// Decode one message and hand it to the subscription.
///
/// Returns false only when the subscription side of the channel is gone.
fn forward(
    pair: &TradingPair,
    raw: &str,
    sink: &mpsc::UnboundedSender<FeedEvent>,
    metrics: &FeedMetrics,
) -> bool {
    match BookEvent::parse(raw) {
        Ok(BookEvent::Unrecognized(event)) => {
            trace!(pair = %pair, event = %event, "Ignoring event");
            true
        }
        Ok(event) => sink
            .send(FeedEvent {
                pair: pair.clone(),
                event,
            })
            .is_ok(),
        Err(e) => {
            let label = pair.to_string();
            metrics
                .decode_errors
                .with_label_values(&[label.as_str()])
                .inc();
            debug!(pair = %pair, error = %e, "Dropping malformed message");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PriceLevel;
    use rust_decimal_macros::dec;

    fn btc() -> TradingPair {
        TradingPair::new("BTC", "THB")
    }

    #[test]
    fn test_forward_decodes_delta() {
        let metrics = FeedMetrics::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(forward(&btc(), r#"{"event":"askschanged","data":[[5,1]]}"#, &tx, &metrics));
        assert_eq!(
            rx.try_recv().unwrap(),
            FeedEvent {
                pair: btc(),
                event: BookEvent::AskDelta(vec![PriceLevel::new(dec!(5), dec!(1))]),
            }
        );
    }

    #[test]
    fn test_forward_swallows_malformed_and_unrecognized() {
        let metrics = FeedMetrics::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(forward(&btc(), "{broken", &tx, &metrics));
        assert!(forward(&btc(), r#"{"event":"ticker","data":{}}"#, &tx, &metrics));
        assert!(rx.try_recv().is_err());
        assert_eq!(
            metrics.decode_errors.with_label_values(&["BTC_THB"]).get(),
            1
        );
    }

    #[test]
    fn test_forward_reports_closed_subscription() {
        let metrics = FeedMetrics::new().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        assert!(!forward(&btc(), r#"{"event":"bidschanged","data":[]}"#, &tx, &metrics));
    }

    #[test]
    fn test_stream_url() {
        let manager = ConnectionManager::new(
            crate::websocket::WsTransport,
            "wss://api.bitkub.com/websocket-api/",
            FeedMetrics::new().unwrap(),
        );
        assert_eq!(
            manager.stream_url(7),
            "wss://api.bitkub.com/websocket-api/orderbook/7"
        );
    }
}
