//! Outbound side of the realtime session transport.

use async_trait::async_trait;
use followup_core::{error::FollowUpError, events::ClientEvent};
use tokio::sync::mpsc;

/// Accepts client events destined for the realtime session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: ClientEvent) -> Result<(), FollowUpError>;
}

/// Forwards client events into a channel drained by the transport.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ClientEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send(&self, event: ClientEvent) -> Result<(), FollowUpError> {
        self.tx
            .send(event)
            .await
            .map_err(|e| FollowUpError::SinkClosed(e.to_string()))
    }
}
