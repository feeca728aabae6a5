use std::time::SystemTime;

use crate::traffic::node_id::{LinkId, NodeId};
use crate::traffic::protocols::ProtocolNames;

/// One classified packet, as handed over by the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketEvent {
    pub src: NodeId,
    pub dst: NodeId,
    /// Conversation the packet belongs to, oriented `(src, dst)`.
    pub link: LinkId,
    pub size: u32,
    pub timestamp: SystemTime,
    pub names: ProtocolNames,
}

impl PacketEvent {
    pub fn new(
        src: NodeId,
        dst: NodeId,
        size: u32,
        timestamp: SystemTime,
        names: ProtocolNames,
    ) -> Self {
        PacketEvent {
            src,
            dst,
            link: LinkId::new(src, dst),
            size,
            timestamp,
            names,
        }
    }
}
