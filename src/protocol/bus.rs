use tokio::sync::mpsc;

use super::host::OutboundMessage;
use crate::error::BusError;

/// Fire-and-forget channel to the host page. No acknowledgement, no retry.
pub trait HostBus: Send + Sync {
    fn post(&self, message: OutboundMessage) -> Result<(), BusError>;
}

/// Transport-free bus; whoever holds the receiver decides where messages go.
#[derive(Debug, Clone)]
pub struct ChannelBus {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostBus for ChannelBus {
    fn post(&self, message: OutboundMessage) -> Result<(), BusError> {
        self.tx.send(message).map_err(|_| BusError::Closed)
    }
}
