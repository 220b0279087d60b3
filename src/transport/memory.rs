//! In-process transport: a [`Connector`] paired with a [`MemoryPeer`] that plays
//! the service side.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderMap;

use super::{BoxFuture, Connection, Connector, Frame, MessageSink, MessageSource, TransportError};

/// Something the client wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Ping,
    Close(String),
}

impl Outgoing {
    /// Parse a text frame as JSON; `None` for pings and closes.
    #[must_use]
    pub fn json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Text(text) => serde_json::from_str(text).ok(),
            _ => None,
        }
    }
}

/// The handshake as seen by the peer.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub url: String,
    pub headers: HeaderMap,
}

#[derive(Default)]
struct WriteControl {
    stall: AtomicBool,
    fail: AtomicBool,
}

/// Create a connector that hands out exactly one connection, and its peer.
#[must_use]
pub fn pair() -> (MemoryConnector, MemoryPeer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let control = Arc::new(WriteControl::default());
    let handshake = Arc::new(Mutex::new(None));

    let connection = Connection {
        sink: Box::new(MemorySink {
            outbound: outbound_tx,
            control: Arc::clone(&control),
        }),
        source: Box::new(MemorySource { inbound: inbound_rx }),
    };
    let connector = MemoryConnector {
        connection: Mutex::new(Some(connection)),
        handshake: Arc::clone(&handshake),
    };
    let peer = MemoryPeer {
        inbound: Some(inbound_tx),
        outbound: outbound_rx,
        control,
        handshake,
    };
    (connector, peer)
}

pub struct MemoryConnector {
    connection: Mutex<Option<Connection>>,
    handshake: Arc<Mutex<Option<Handshake>>>,
}

impl Connector for MemoryConnector {
    fn connect(&self, request: Request) -> BoxFuture<'_, Result<Connection, TransportError>> {
        *self.handshake.lock() = Some(Handshake {
            url: request.uri().to_string(),
            headers: request.headers().clone(),
        });
        let connection = self.connection.lock().take();
        Box::pin(async move {
            connection.ok_or_else(|| TransportError::from("memory transport already connected"))
        })
    }
}

/// Service side of a [`pair`].
pub struct MemoryPeer {
    inbound: Option<mpsc::UnboundedSender<Result<Frame, TransportError>>>,
    outbound: mpsc::UnboundedReceiver<Outgoing>,
    control: Arc<WriteControl>,
    handshake: Arc<Mutex<Option<Handshake>>>,
}

impl MemoryPeer {
    #[must_use]
    pub fn handshake(&self) -> Option<Handshake> {
        self.handshake.lock().clone()
    }

    /// Deliver a text frame to the client. Returns false once the client is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.push(Ok(Frame::Text(text.into())))
    }

    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        self.send_text(value.to_string())
    }

    pub fn send_binary(&self, bytes: Vec<u8>) -> bool {
        self.push(Ok(Frame::Binary(bytes)))
    }

    /// Deliver a read error to the client.
    pub fn fail_read(&self, message: &str) -> bool {
        self.push(Err(message.to_owned().into()))
    }

    fn push(&self, frame: Result<Frame, TransportError>) -> bool {
        self.inbound
            .as_ref()
            .is_some_and(|inbound| inbound.send(frame).is_ok())
    }

    /// End the inbound stream, as if the service dropped the connection.
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Make every subsequent write block forever.
    pub fn stall_writes(&self, stall: bool) {
        self.control.stall.store(stall, Ordering::SeqCst);
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.control.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn next_outgoing(&mut self) -> Option<Outgoing> {
        self.outbound.recv().await
    }

    /// Next text frame, skipping pings.
    pub async fn next_text(&mut self) -> Option<String> {
        loop {
            match self.outbound.recv().await? {
                Outgoing::Text(text) => return Some(text),
                Outgoing::Ping => {}
                Outgoing::Close(_) => return None,
            }
        }
    }

    /// Next text frame parsed as JSON, skipping pings.
    pub async fn next_json(&mut self) -> Option<serde_json::Value> {
        let text = self.next_text().await?;
        serde_json::from_str(&text).ok()
    }

    /// Everything written so far, without waiting.
    pub fn drain(&mut self) -> Vec<Outgoing> {
        let mut written = Vec::new();
        while let Ok(item) = self.outbound.try_recv() {
            written.push(item);
        }
        written
    }
}

struct MemorySink {
    outbound: mpsc::UnboundedSender<Outgoing>,
    control: Arc<WriteControl>,
}

impl MemorySink {
    async fn write(&self, item: Outgoing) -> Result<(), TransportError> {
        if self.control.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.control.fail.load(Ordering::SeqCst) {
            return Err("memory transport write failed".into());
        }
        self.outbound
            .send(item)
            .map_err(|_| TransportError::from("memory peer is gone"))
    }
}

impl MessageSink for MemorySink {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(self.write(Outgoing::Text(text)))
    }

    fn ping(&mut self) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(self.write(Outgoing::Ping))
    }

    fn close(&mut self, reason: &str) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(self.write(Outgoing::Close(reason.to_owned())))
    }
}

struct MemorySource {
    inbound: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
}

impl MessageSource for MemorySource {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<Frame, TransportError>>> {
        Box::pin(self.inbound.recv())
    }
}
