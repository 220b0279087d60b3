use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{BoxFuture, Connection, Connector, Frame, MessageSink, MessageSource, TransportError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects over TLS or plain TCP with `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, request: Request) -> BoxFuture<'_, Result<Connection, TransportError>> {
        Box::pin(async move {
            let (socket, response) = connect_async(request)
                .await
                .map_err(TransportError::from)?;
            tracing::debug!(status = %response.status(), "WebSocket handshake complete");
            let (write, read) = socket.split();
            Ok::<_, TransportError>(Connection {
                sink: Box::new(WsSink(write)),
                source: Box::new(WsSource(read)),
            })
        })
    }
}

struct WsSink(SplitSink<Socket, Message>);

impl MessageSink for WsSink {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(async move {
            self.0
                .send(Message::Text(text.into()))
                .await
                .map_err(TransportError::from)
        })
    }

    fn ping(&mut self) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(async move {
            self.0
                .send(Message::Ping(Vec::new().into()))
                .await
                .map_err(TransportError::from)
        })
    }

    fn close(&mut self, reason: &str) -> BoxFuture<'_, Result<(), TransportError>> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_owned().into(),
        };
        Box::pin(async move {
            self.0
                .send(Message::Close(Some(frame)))
                .await
                .map_err(TransportError::from)
        })
    }
}

struct WsSource(SplitStream<Socket>);

impl MessageSource for WsSource {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<Frame, TransportError>>> {
        Box::pin(async move {
            match self.0.next().await? {
                Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Ok(Message::Binary(bytes)) => Some(Ok(Frame::Binary(bytes.to_vec()))),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "peer sent close frame");
                    None
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                    Some(Ok(Frame::Control))
                }
                Err(err) => Some(Err(TransportError::from(err))),
            }
        })
    }
}
