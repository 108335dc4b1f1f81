use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shared::protocol::{Command, OutputData, WireCommand};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info};
use url::Url;

use crate::{EngineClient, EngineError};

/// Engine bridge speaking JSON over a WebSocket: each batch is one text frame
/// holding a command array, answered by one frame holding an output array.
pub struct WsEngineClient {
    url: Url,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    batches_sent: u64,
}

impl WsEngineClient {
    pub async fn connect(url: &str) -> Result<Self, EngineError> {
        let parsed = Url::parse(url).map_err(|source| EngineError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let (socket, _) =
            connect_async(parsed.as_str())
                .await
                .map_err(|source| EngineError::Connect {
                    url: url.to_string(),
                    source,
                })?;
        info!(url = %parsed, "connected to engine");
        Ok(Self {
            url: parsed,
            socket,
            batches_sent: 0,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn batches_sent(&self) -> u64 {
        self.batches_sent
    }

    async fn receive_outputs(&mut self) -> Result<Vec<OutputData>, EngineError> {
        while let Some(message) = self.socket.next().await {
            let message = match message {
                Ok(message) => message,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    return Err(EngineError::Disconnected)
                }
                Err(err) => return Err(err.into()),
            };
            match message {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Binary(bytes) => return Ok(serde_json::from_slice(&bytes)?),
                Message::Close(_) => return Err(EngineError::Disconnected),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
        Err(EngineError::Disconnected)
    }
}

#[async_trait]
impl EngineClient for WsEngineClient {
    async fn communicate(
        &mut self,
        batch: Vec<WireCommand>,
    ) -> Result<Vec<OutputData>, EngineError> {
        let terminating = batch
            .iter()
            .any(|command| matches!(command.as_typed(), Some(Command::Terminate)));
        let payload = serde_json::to_string(&batch)?;
        self.socket.send(Message::Text(payload)).await?;
        self.batches_sent += 1;
        debug!(frame = self.batches_sent, commands = batch.len(), "batch sent");

        match self.receive_outputs().await {
            Err(EngineError::Disconnected) if terminating => {
                info!("engine closed after terminate");
                Ok(Vec::new())
            }
            result => result,
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
