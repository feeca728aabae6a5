use std::fmt::{self, Display};
use std::time::SystemTime;

use crate::traffic::node_id::LinkId;
use crate::traffic::packet::{Direction, SharedPacket};
use crate::traffic::protocols::LEVELS;
use crate::traffic::stats::TrafficStats;

use super::catalog::Tracked;

/// A conversation between two endpoints.
///
/// Endpoints are held by id, not by reference: a link outlives its nodes
/// if they are evicted first, and the display side hides it instead.
#[derive(Debug)]
pub struct Link {
    pub id: LinkId,
    pub src_name: String,
    pub dst_name: String,
    pub traffic: TrafficStats,
    main_prot: [Option<String>; LEVELS],
}

impl Link {
    pub fn new(id: LinkId, src_name: String, dst_name: String) -> Self {
        Link {
            id,
            src_name,
            dst_name,
            traffic: TrafficStats::new(),
            main_prot: Default::default(),
        }
    }

    pub fn add_packet(&mut self, packet: &SharedPacket) {
        let names = [self.src_name.as_str(), self.dst_name.as_str()];
        self.traffic.add_packet(packet, Direction::Either, &names);
    }

    pub fn average(&self) -> f64 {
        self.traffic.total.average
    }

    pub fn accumulated(&self) -> u64 {
        self.traffic.total.accumulated
    }

    pub fn last_seen(&self) -> SystemTime {
        self.traffic.last_seen()
    }

    pub fn main_prot(&self, level: usize) -> Option<&str> {
        self.main_prot[level].as_deref()
    }

    pub fn main_protocols(&self) -> &[Option<String>; LEVELS] {
        &self.main_prot
    }
}

impl Tracked for Link {
    fn traffic_mut(&mut self) -> &mut TrafficStats {
        &mut self.traffic
    }

    fn refresh_main_protocols(&mut self) {
        self.main_prot = self.traffic.protocols.main_protocols();
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {:.0} bps, {} bytes",
            self.src_name, self.dst_name, self.traffic.total.average, self.traffic.total.accumulated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::node_id::NodeId;
    use crate::traffic::packet::PacketRecord;
    use crate::traffic::protocols::ProtocolNames;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_link_counts_both_names() {
        let a: NodeId = "10.0.0.1".parse().unwrap();
        let b: NodeId = "10.0.0.2".parse().unwrap();
        let mut link = Link::new(LinkId::new(a, b), "alpha".into(), "beta".into());
        let packet = PacketRecord::new(64, UNIX_EPOCH, ProtocolNames::from_stack(&["ETH_II", "ARP"]));
        link.add_packet(&packet);

        assert_eq!(link.accumulated(), 64);
        assert_eq!(link.traffic.inbound.accumulated, 0);
        assert_eq!(link.traffic.outbound.accumulated, 0);
        assert_eq!(
            link.traffic.protocols.find(2, "ARP").unwrap().node_names(),
            vec!["alpha", "beta"]
        );
        assert_eq!(link.to_string(), "alpha -> beta: 0 bps, 64 bytes");
    }
}
