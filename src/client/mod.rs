//! Session client: one live connection, a receive task that dispatches events to
//! registered handlers, a keepalive task, and a serialized send path.

mod dispatch;
mod handlers;
mod ids;

pub use handlers::EventHandler;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;

use crate::audio::pcm16_from_samples;
use crate::config::Config;
use crate::error::{Error, Result, SendFailure};
use crate::logging::{TRACE_LOG_MAX_BYTES, safe_truncate};
use crate::protocol::client_events::ClientEvent;
use crate::protocol::models::{ConversationItem, ResponseOptions, SessionConfig};
use crate::transport::ws::WsConnector;
use crate::transport::{Connector, Frame, MessageSink, MessageSource, TransportError};
use crate::validate;
use handlers::HandlerRegistry;

/// Deadline for a single outbound write.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(15);
/// Interval between keepalive pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(20);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    /// Shutdown has started but the closure signal has not fired yet.
    Closing,
    Closed,
}

struct Shared {
    url: String,
    /// `None` once the connection is gone. Held for the whole of each write.
    sink: Mutex<Option<Box<dyn MessageSink>>>,
    handlers: HandlerRegistry,
    /// Stops the receive and keepalive tasks.
    shutdown: CancellationToken,
    /// Fires once, after the transport has been released.
    closed: CancellationToken,
    closed_once: AtomicBool,
}

impl Shared {
    async fn send(&self, event: &ClientEvent) -> Result<()> {
        let event_type = event.event_type();
        let event_id = event.event_id().map(str::to_owned);

        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Err(Error::Closed);
        };
        let json = serde_json::to_string(event).map_err(|err| Error::Send {
            event_type,
            event_id: event_id.clone(),
            source: SendFailure::Serialize(err),
        })?;
        tracing::trace!(
            event_type,
            "sending event: {}",
            safe_truncate(&json, TRACE_LOG_MAX_BYTES)
        );
        match tokio::time::timeout(SEND_TIMEOUT, sink.send_text(json)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(Error::Send {
                event_type,
                event_id,
                source: SendFailure::Transport(source),
            }),
            Err(_) => Err(Error::Send {
                event_type,
                event_id,
                source: SendFailure::Timeout(SEND_TIMEOUT),
            }),
        }
    }

    async fn ping(&self) {
        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return;
        };
        match tokio::time::timeout(SEND_TIMEOUT, sink.ping()).await {
            Ok(Ok(())) => tracing::trace!("ping sent"),
            Ok(Err(err)) => tracing::debug!(error = %err, "ping_failed"),
            Err(_) => tracing::debug!("ping_failed: timed out"),
        }
    }

    /// Release the transport and fire the closure signal. Safe to call any
    /// number of times from any task.
    async fn shut_down(&self, reason: &'static str) {
        self.shutdown.cancel();
        // Held until the close frame is out so a concurrent caller cannot fire
        // the closure signal early.
        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, sink.close(reason)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::debug!(error = %err, "close frame not delivered"),
                Err(_) => tracing::debug!("close frame timed out"),
            }
        }
        drop(guard);
        if !self.closed_once.swap(true, Ordering::AcqRel) {
            tracing::info!(url = %self.url, reason, "ws_closed");
            self.closed.cancel();
        }
    }
}

/// A live realtime session.
///
/// All methods take `&self`; share the client across tasks with an `Arc`.
/// Dropping the last handle stops the background tasks and closes the
/// connection.
pub struct Client {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.shared.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connect over WebSocket.
    ///
    /// # Errors
    /// Returns a configuration error before any network activity if `config` is
    /// invalid, or a connection error if the handshake fails or times out.
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::connect_with(config, &WsConnector).await
    }

    /// Connect through a custom [`Connector`].
    ///
    /// # Errors
    /// Same as [`Client::connect`].
    pub async fn connect_with(config: &Config, connector: &dyn Connector) -> Result<Self> {
        let dispatch = config
            .dispatch
            .clone()
            .unwrap_or_else(|| tracing::dispatcher::get_default(tracing::Dispatch::clone));
        Self::open(config, connector, dispatch.clone())
            .with_subscriber(dispatch)
            .await
    }

    async fn open(
        config: &Config,
        connector: &dyn Connector,
        dispatch: tracing::Dispatch,
    ) -> Result<Self> {
        let request = config.handshake_request()?;
        let url = request.uri().to_string();

        let dial = connector.connect(request);
        let connected = match config.dial_timeout {
            Some(limit) => match tokio::time::timeout(limit, dial).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::from(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("handshake did not complete within {limit:?}"),
                ))),
            },
            None => dial.await,
        };
        let connection = connected.map_err(|source| Error::Connection {
            url: url.clone(),
            operation: "dial",
            source,
        })?;
        tracing::info!(url = %url, "ws_connected");

        let shared = Arc::new(Shared {
            url,
            sink: Mutex::new(Some(connection.sink)),
            handlers: HandlerRegistry::default(),
            shutdown: CancellationToken::new(),
            closed: CancellationToken::new(),
            closed_once: AtomicBool::new(false),
        });
        tokio::spawn(
            receive_loop(Arc::clone(&shared), connection.source).with_subscriber(dispatch.clone()),
        );
        tokio::spawn(keepalive_loop(Arc::clone(&shared)).with_subscriber(dispatch));
        Ok(Self { shared })
    }

    /// Realtime endpoint this client connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.shared.closed.is_cancelled() {
            ConnectionState::Closed
        } else if self.shared.shutdown.is_cancelled() {
            ConnectionState::Closing
        } else {
            ConnectionState::Open
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    /// Resolves once the connection has been released, whoever closed it.
    pub async fn closed(&self) {
        self.shared.closed.cancelled().await;
    }

    /// A token cancelled when the connection closes. Cancelling it has no
    /// effect on the client.
    #[must_use]
    pub fn closed_token(&self) -> CancellationToken {
        self.shared.closed.child_token()
    }

    /// Stop the background tasks and close the connection. Idempotent; later
    /// sends fail with [`Error::Closed`].
    ///
    /// # Errors
    /// Never fails today; the `Result` leaves room for transports that report
    /// close failures.
    pub async fn close(&self) -> Result<()> {
        self.shared.shut_down("closing").await;
        Ok(())
    }

    /// Validate and send any command.
    ///
    /// # Errors
    /// Returns a configuration error if `event` is rejected, [`Error::Closed`]
    /// after close, or a send error if the write fails or times out.
    pub async fn send_event(&self, event: ClientEvent) -> Result<()> {
        validate::validate_client_event(&event)?;
        self.shared.send(&event).await
    }

    /// Send `session.update`.
    ///
    /// # Errors
    /// Returns a configuration error if `session` is rejected, otherwise any send error.
    pub async fn session_update(&self, session: &SessionConfig) -> Result<()> {
        validate::validate_session(session)?;
        self.shared
            .send(&ClientEvent::SessionUpdate {
                event_id: Some(ids::next_event_id()),
                session: Box::new(session.clone()),
            })
            .await
    }

    /// Send `response.create` and return its correlation id.
    ///
    /// # Errors
    /// Returns a configuration error if `options` are rejected, otherwise any send error.
    pub async fn create_response(&self, options: &ResponseOptions) -> Result<String> {
        validate::validate_response_options(options)?;
        let event_id = ids::next_event_id();
        self.shared
            .send(&ClientEvent::ResponseCreate {
                event_id: Some(event_id.clone()),
                response: Box::new(options.clone()),
            })
            .await?;
        Ok(event_id)
    }

    /// Send `response.cancel`.
    ///
    /// # Errors
    /// Returns any send error.
    pub async fn cancel_response(&self) -> Result<()> {
        self.shared
            .send(&ClientEvent::ResponseCancel {
                event_id: Some(ids::next_event_id()),
            })
            .await
    }

    /// Append little-endian PCM16 bytes to the input buffer. Empty input sends nothing.
    ///
    /// # Errors
    /// Returns a configuration error for an odd length or more than
    /// [`MAX_APPEND_BYTES`](crate::validate::MAX_APPEND_BYTES), otherwise any send error.
    pub async fn append_pcm16(&self, pcm: &[u8]) -> Result<()> {
        validate::validate_pcm16(pcm)?;
        if pcm.is_empty() {
            return Ok(());
        }
        self.shared
            .send(&ClientEvent::InputAudioBufferAppend {
                event_id: Some(ids::next_event_id()),
                audio: STANDARD.encode(pcm),
            })
            .await
    }

    /// Like [`Client::append_pcm16`], for samples.
    ///
    /// # Errors
    /// Same as [`Client::append_pcm16`].
    pub async fn append_pcm16_samples(&self, samples: &[i16]) -> Result<()> {
        self.append_pcm16(&pcm16_from_samples(samples)).await
    }

    /// Send `input_audio_buffer.commit`.
    ///
    /// # Errors
    /// Returns any send error.
    pub async fn input_commit(&self) -> Result<()> {
        self.shared
            .send(&ClientEvent::InputAudioBufferCommit {
                event_id: Some(ids::next_event_id()),
            })
            .await
    }

    /// Send `input_audio_buffer.clear`.
    ///
    /// # Errors
    /// Returns any send error.
    pub async fn input_clear(&self) -> Result<()> {
        self.shared
            .send(&ClientEvent::InputAudioBufferClear {
                event_id: Some(ids::next_event_id()),
            })
            .await
    }

    /// Insert `item` into the conversation, after `previous_item_id` when given.
    ///
    /// # Errors
    /// Returns a configuration error if the item is incomplete, otherwise any send error.
    pub async fn create_conversation_item(
        &self,
        item: &ConversationItem,
        previous_item_id: Option<&str>,
    ) -> Result<()> {
        self.send_event(ClientEvent::ConversationItemCreate {
            event_id: Some(ids::next_event_id()),
            previous_item_id: previous_item_id.map(str::to_owned),
            item: Box::new(item.clone()),
        })
        .await
    }

    /// Truncate an assistant audio item at `audio_end_ms`.
    ///
    /// # Errors
    /// Returns a configuration error for an empty id or negative offset,
    /// otherwise any send error.
    pub async fn truncate_conversation_item(
        &self,
        item_id: &str,
        content_index: u32,
        audio_end_ms: i64,
    ) -> Result<()> {
        self.send_event(ClientEvent::ConversationItemTruncate {
            event_id: Some(ids::next_event_id()),
            item_id: item_id.to_owned(),
            content_index,
            audio_end_ms,
        })
        .await
    }

    /// # Errors
    /// Returns a configuration error for an empty id, otherwise any send error.
    pub async fn delete_conversation_item(&self, item_id: &str) -> Result<()> {
        self.send_event(ClientEvent::ConversationItemDelete {
            event_id: Some(ids::next_event_id()),
            item_id: item_id.to_owned(),
        })
        .await
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

async fn receive_loop(shared: Arc<Shared>, mut source: Box<dyn MessageSource>) {
    let reason = loop {
        let frame = tokio::select! {
            () = shared.shutdown.cancelled() => break "closing",
            frame = source.next_frame() => frame,
        };
        match frame {
            Some(Ok(Frame::Text(text))) => dispatch::dispatch_message(&shared.handlers, &text),
            Some(Ok(Frame::Binary(bytes))) => {
                tracing::trace!(len = bytes.len(), "ignoring binary frame");
            }
            Some(Ok(Frame::Control)) => {}
            Some(Err(err)) => {
                tracing::debug!(error = %err, "read failed");
                break "reader_exit";
            }
            None => break "reader_exit",
        }
    };
    drop(source);
    shared.shut_down(reason).await;
}

async fn keepalive_loop(shared: Arc<Shared>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = shared.shutdown.cancelled() => break,
            _ = ticker.tick() => shared.ping().await,
        }
    }
}
