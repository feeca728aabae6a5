pub mod source;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::traffic::{NodeId, PacketEvent};

pub type CapEventSender = UnboundedSender<CapEvent>;
pub type CapEventReceiver = UnboundedReceiver<CapEvent>;

/// Messages from the event feed to the aggregation loop.
#[derive(Debug, Clone, PartialEq)]
pub enum CapEvent {
    Packet(PacketEvent),
    /// Out-of-band answer from a name resolver.
    NameResolved(NodeId, String),
    /// The feed has no more events.
    EndOfFeed,
}
