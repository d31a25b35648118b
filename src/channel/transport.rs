//! Transport seam of the push channel and its WebSocket implementation.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::ChannelError;

/// Opens streaming connections to the catalog service.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, ChannelError>;
}

/// One open, bidirectional text stream.
#[async_trait]
pub trait Transport: Send {
    /// Next text frame. `None` once the peer has closed the stream.
    ///
    /// Must be cancel-safe: the session loop races it against outbound sends.
    async fn recv(&mut self) -> Option<Result<String, ChannelError>>;

    async fn send(&mut self, text: String) -> Result<(), ChannelError>;

    /// Closes the stream from our side.
    async fn close(&mut self);
}

/// [`Connector`] backed by tokio-tungstenite.
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, ChannelError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        Ok(Box::new(WsTransport { stream }))
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                    Ok(text) => return Some(Ok(text.to_owned())),
                    Err(_) => continue,
                },
                Ok(Message::Close(_)) => return None,
                // ping/pong replies are queued by tungstenite itself
                Ok(_) => continue,
                Err(e) => return Some(Err(ChannelError::Socket(e.to_string()))),
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ChannelError::Socket(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
