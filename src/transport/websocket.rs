use super::worker::{Connection, Connector, Inbound, WorkerTransport};
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Production transport: one WebSocket per worker
pub type WebSocketTransport = WorkerTransport<WebSocketConnector>;

/// Opens WebSocket connections to the transcription server
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;

    async fn connect(&self, endpoint: &str) -> Result<WebSocketConnection> {
        let (stream, response) = connect_async(endpoint)
            .await
            .with_context(|| format!("Failed to connect to {}", endpoint))?;

        debug!("WebSocket handshake complete (status {})", response.status());

        Ok(WebSocketConnection { stream })
    }
}

/// An open WebSocket: chunks go out as binary frames, results come back as
/// JSON text frames
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl Connection for WebSocketConnection {
    async fn send(&mut self, chunk: Vec<u8>) -> Result<()> {
        self.stream
            .send(Message::Binary(chunk.into()))
            .await
            .context("Failed to send audio chunk")
    }

    async fn recv(&mut self) -> Result<Inbound> {
        while let Some(message) = self.stream.next().await {
            match message.context("Failed to read from WebSocket")? {
                Message::Text(text) => return Ok(Inbound::Text(text.to_string())),
                Message::Close(frame) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by server".to_string());
                    return Ok(Inbound::Closed(reason));
                }
                other => debug!("Ignoring WebSocket frame: {:?}", other),
            }
        }

        Ok(Inbound::Closed("connection ended".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .context("Failed to close WebSocket")
    }
}
