//! Client side of the engine command protocol: the `EngineClient` seam, the
//! WebSocket transport, add-ons that ride along with every batch, and the depth
//! pass codec.

use async_trait::async_trait;
use shared::protocol::{OutputData, WireCommand};
use thiserror::Error;
use tracing::debug;

pub mod add_ons;
pub mod depth;
pub mod transport;

pub use add_ons::AddOn;
pub use transport::WsEngineClient;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to connect to engine at {url}: {source}")]
    Connect {
        url: String,
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("engine transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed engine message: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("engine closed the connection")]
    Disconnected,
    #[error("failed to write capture output: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid image pass encoding: {0}")]
    ImageData(#[from] base64::DecodeError),
    #[error("depth pass {pass_mask} has {actual} bytes, expected {expected}")]
    DepthDecode {
        pass_mask: String,
        expected: usize,
        actual: usize,
    },
}

/// Synchronous request/response seam to the engine: one batch in, that batch's
/// output records out.
#[async_trait]
pub trait EngineClient: Send {
    async fn communicate(&mut self, batch: Vec<WireCommand>)
        -> Result<Vec<OutputData>, EngineError>;
}

/// Sends `batch` with every add-on's pending commands appended, then lets each
/// add-on consume the response.
pub async fn communicate_with_add_ons<C>(
    client: &mut C,
    add_ons: &mut [&mut dyn AddOn],
    mut batch: Vec<WireCommand>,
) -> Result<Vec<OutputData>, EngineError>
where
    C: EngineClient + ?Sized,
{
    for add_on in add_ons.iter_mut() {
        batch.extend(add_on.commands_for_batch().into_iter().map(WireCommand::from));
    }
    debug!(commands = batch.len(), "sending batch");
    let outputs = client.communicate(batch).await?;
    for add_on in add_ons.iter_mut() {
        add_on.on_send(&outputs)?;
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::add_ons::AddOnState;
    use shared::protocol::Command;

    struct EchoEngine {
        batches: Vec<Vec<WireCommand>>,
    }

    #[async_trait]
    impl EngineClient for EchoEngine {
        async fn communicate(
            &mut self,
            batch: Vec<WireCommand>,
        ) -> Result<Vec<OutputData>, EngineError> {
            self.batches.push(batch);
            Ok(vec![OutputData::Unknown])
        }
    }

    #[derive(Default)]
    struct CountingAddOn {
        state: AddOnState,
        responses_seen: usize,
    }

    impl AddOn for CountingAddOn {
        fn state(&mut self) -> &mut AddOnState {
            &mut self.state
        }

        fn initialization_commands(&self) -> Vec<Command> {
            vec![Command::SetRenderQuality { render_quality: 0 }]
        }

        fn on_send(&mut self, outputs: &[OutputData]) -> Result<(), EngineError> {
            self.responses_seen += outputs.len();
            Ok(())
        }
    }

    #[tokio::test]
    async fn add_on_commands_follow_caller_commands() {
        let mut engine = EchoEngine {
            batches: Vec::new(),
        };
        let mut add_on = CountingAddOn::default();

        communicate_with_add_ons(
            &mut engine,
            &mut [&mut add_on],
            vec![Command::Terminate.into()],
        )
        .await
        .expect("first batch");
        communicate_with_add_ons(&mut engine, &mut [&mut add_on], Vec::new())
            .await
            .expect("second batch");

        assert_eq!(
            engine.batches[0],
            vec![
                WireCommand::from(Command::Terminate),
                WireCommand::from(Command::SetRenderQuality { render_quality: 0 }),
            ]
        );
        assert!(engine.batches[1].is_empty());
        assert_eq!(add_on.responses_seen, 2);
    }
}
