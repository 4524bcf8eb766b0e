//! WebSocket module for Bitkub order book streams
//!
//! [`Transport`] and [`FeedConnection`] are the seams between the stream
//! engine and the network; [`WsTransport`] is the tokio-tungstenite backed
//! implementation used in production.

mod client;
mod manager;

pub use client::{WebSocketClient, WsTransport};
pub use manager::{ConnectionHandle, ConnectionManager, FeedEvent};

use std::future::Future;

use crate::error::Result;

/// Opens streaming connections to an address
pub trait Transport: Send + Sync + 'static {
    type Connection: FeedConnection;

    fn open(&self, url: &str) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// One open streaming connection
pub trait FeedConnection: Send + 'static {
    /// Receive the next message.
    ///
    /// `Ok(None)` for control frames, `Err` once the connection is unusable.
    fn recv(&mut self) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Close the connection. Safe to call more than once.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
