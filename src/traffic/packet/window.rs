use std::collections::VecDeque;
use std::rc::Rc;
use std::time::SystemTime;

use super::{Direction, SharedPacket};

/// One window's hold on a shared packet.
#[derive(Debug, Clone)]
pub struct Membership {
    pub packet: SharedPacket,
    pub direction: Direction,
}

/// Time-ordered list of packets still counted by one tracker.
///
/// The newest packet sits at the front, the oldest at the back (the tail).
/// Insertion is always at the front and callers feed packets in
/// non-decreasing timestamp order, so expiry can stop at the first
/// unexpired packet it meets walking from the tail.
#[derive(Debug, Default)]
pub struct PacketWindow {
    members: VecDeque<Membership>,
    sum_bytes: u64,
}

impl PacketWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a reference on `packet` and records it as the newest member.
    pub fn attach(&mut self, packet: &SharedPacket, direction: Direction) {
        debug_assert!(
            self.newest()
                .map_or(true, |newest| newest.timestamp <= packet.timestamp),
            "packets must be attached in timestamp order"
        );
        self.sum_bytes += packet.size as u64;
        self.members.push_front(Membership {
            packet: Rc::clone(packet),
            direction,
        });
    }

    /// Releases the oldest membership. The returned handle is the window's
    /// former reference; dropping it may free the record.
    pub fn detach_tail(&mut self) -> Option<Membership> {
        let member = self.members.pop_back()?;
        self.sum_bytes -= member.packet.size as u64;
        Some(member)
    }

    pub fn oldest(&self) -> Option<&SharedPacket> {
        self.members.back().map(|m| &m.packet)
    }

    pub fn newest(&self) -> Option<&SharedPacket> {
        self.members.front().map(|m| &m.packet)
    }

    /// Age of the oldest packet, or `None` for an empty window.
    pub fn span(&self, now: SystemTime) -> Option<std::time::Duration> {
        self.oldest().map(|p| p.age(now))
    }

    /// Bytes of all packets currently attached.
    pub fn sum_bytes(&self) -> u64 {
        self.sum_bytes
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Membership> {
        self.members.iter()
    }

    pub fn holds(&self, packet: &SharedPacket) -> bool {
        self.members.iter().any(|m| Rc::ptr_eq(&m.packet, packet))
    }
}
