use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::error::{Result, StreamError};

/// Bound on inbound events buffered ahead of the session coordinator.
const EVENT_QUEUE: usize = 64;

/// An asynchronous notification from the transport's receive side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text payload from the remote endpoint.
    Message(String),
    /// The remote closed the connection.
    Closed { code: u16, reason: String },
    /// The connection failed.
    Failure(String),
}

/// Opens connections to the remote endpoint.
///
/// The production implementation is [`WsTransport`]; tests substitute their
/// own to drive the session without a network.
///
/// `open` yields the sending half plus a channel of receive events: the
/// transport pumps its own receive context onto that channel, so the session
/// coordinator consumes events from a single place regardless of which
/// thread the transport delivers them on.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn open(
        &mut self,
        url: &str,
    ) -> Result<(Box<dyn Connection>, mpsc::Receiver<TransportEvent>)>;
}

/// The sending half of a live connection. Owned by a single session task.
#[async_trait]
pub trait Connection: Send {
    /// Send one text payload. Fails with `Send` when the socket is gone.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Close the connection with a status code and reason.
    async fn close(&mut self, code: u16, reason: &str) -> Result<()>;
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// WebSocket transport over tokio-tungstenite.
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn open(
        &mut self,
        url: &str,
    ) -> Result<(Box<dyn Connection>, mpsc::Receiver<TransportEvent>)> {
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| StreamError::Connect(format!("{}: {}", url, e)))?;

        info!("Connected to {}", url);

        let (sink, mut stream) = ws_stream.split();
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);

        // Receive pump: maps WebSocket frames onto the event channel until
        // the stream ends or the session drops the receiver.
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                let event = match item {
                    Ok(Message::Text(text)) => TransportEvent::Message(text),
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = match frame {
                            Some(frame) => (u16::from(frame.code), frame.reason.to_string()),
                            None => (1005, String::new()),
                        };
                        TransportEvent::Closed { code, reason }
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                        // Pongs are queued by tungstenite; nothing to do.
                        debug!("WebSocket ping/pong");
                        continue;
                    }
                    Ok(other) => {
                        debug!("Ignoring unexpected WebSocket frame: {:?}", other);
                        continue;
                    }
                    Err(e) => TransportEvent::Failure(e.to_string()),
                };

                let terminal = !matches!(event, TransportEvent::Message(_));
                if event_tx.send(event).await.is_err() || terminal {
                    break;
                }
            }
            debug!("WebSocket receive pump finished");
        });

        Ok((Box::new(WsConnection { sink }), event_rx))
    }
}

struct WsConnection {
    sink: WsSink,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| StreamError::Send(e.to_string()))
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.sink
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| StreamError::Send(e.to_string()))
    }
}
