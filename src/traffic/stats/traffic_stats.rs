use std::time::{Duration, SystemTime};

use crate::traffic::packet::{Direction, PacketWindow, SharedPacket};
use crate::traffic::protocols::ProtocolStack;

use super::BasicStats;

/// Everything one tracker knows about its recent traffic: the packet window,
/// directional statistics and the protocol breakdown. Kept consistent
/// incrementally; every packet attached is later subtracted exactly once.
#[derive(Debug, Default)]
pub struct TrafficStats {
    window: PacketWindow,
    pub total: BasicStats,
    pub inbound: BasicStats,
    pub outbound: BasicStats,
    pub protocols: ProtocolStack,
}

impl TrafficStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_packet(&mut self, packet: &SharedPacket, direction: Direction, remote_names: &[&str]) {
        self.window.attach(packet, direction);
        self.total.add(packet.size, packet.timestamp);
        match direction {
            Direction::Inbound => self.inbound.add(packet.size, packet.timestamp),
            Direction::Outbound => self.outbound.add(packet.size, packet.timestamp),
            Direction::Either => {}
        }
        self.protocols
            .add_packet(&packet.names, packet.size, packet.timestamp, remote_names);
    }

    /// Detaches the oldest packet and subtracts it from every aggregate.
    fn expire_tail(&mut self) -> Option<SharedPacket> {
        let member = self.window.detach_tail()?;
        let size = member.packet.size;
        self.total.sub(size);
        match member.direction {
            Direction::Inbound => self.inbound.sub(size),
            Direction::Outbound => self.outbound.sub(size),
            Direction::Either => {}
        }
        self.protocols.sub_packet(&member.packet.names, size);
        Some(member.packet)
    }

    /// Expires packets older than `interval`, oldest first, stopping at the
    /// first one still inside it. `drain_all` expires regardless of age.
    /// Returns how many packets were released.
    pub fn purge_expired(&mut self, now: SystemTime, interval: Duration, drain_all: bool) -> usize {
        let mut expired = 0;
        while let Some(oldest) = self.window.oldest() {
            if !drain_all && oldest.age(now) <= interval {
                break;
            }
            self.expire_tail();
            expired += 1;
        }
        expired
    }

    /// Releases every packet still held.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        while self.expire_tail().is_some() {
            released += 1;
        }
        released
    }

    /// Recomputes the bit rates from the age of the oldest packet. Returns
    /// false when that age is zero and the previous averages were kept.
    pub fn update_averages(&mut self, now: SystemTime) -> bool {
        let span = self
            .window
            .span(now)
            .expect("averages recomputed on an empty window");
        if span.is_zero() {
            return false;
        }
        self.total.recompute_average(span);
        self.inbound.recompute_average(span);
        self.outbound.recompute_average(span);
        true
    }

    pub fn reset_averages(&mut self) {
        self.total.reset_average();
        self.inbound.reset_average();
        self.outbound.reset_average();
    }

    pub fn window(&self) -> &PacketWindow {
        &self.window
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn last_seen(&self) -> SystemTime {
        self.total.last_seen
    }
}
