//! Cross-window messaging with the embedding host page.

pub mod bus;
pub mod host;

pub use bus::{ChannelBus, HostBus};
pub use host::{EnvelopeError, HostEnvelope, InboundMessage, OriginPolicy, OutboundMessage};
