//! Message-level transport seams.
//!
//! The client only needs to write text frames, send pings, close, and read
//! frames. [`ws`] provides the WebSocket implementation and [`memory`] an
//! in-process pair used by tests and demos.

pub mod memory;
pub mod rest;
pub mod ws;

use std::future::Future;
use std::pin::Pin;

use tokio_tungstenite::tungstenite::handshake::client::Request;

pub use crate::error::TransportError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Ping, pong and other control traffic.
    Control,
}

/// Write half of a connection.
pub trait MessageSink: Send {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<(), TransportError>>;
    fn ping(&mut self) -> BoxFuture<'_, Result<(), TransportError>>;
    fn close(&mut self, reason: &str) -> BoxFuture<'_, Result<(), TransportError>>;
}

/// Read half of a connection. `None` means the peer is gone.
pub trait MessageSource: Send {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<Frame, TransportError>>>;
}

pub struct Connection {
    pub sink: Box<dyn MessageSink>,
    pub source: Box<dyn MessageSource>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens connections from a prepared handshake request.
pub trait Connector: Send + Sync {
    fn connect(&self, request: Request) -> BoxFuture<'_, Result<Connection, TransportError>>;
}
