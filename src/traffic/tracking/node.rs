use std::fmt::{self, Display};
use std::time::SystemTime;

use crate::traffic::node_id::NodeId;
use crate::traffic::packet::{Direction, SharedPacket};
use crate::traffic::protocols::LEVELS;
use crate::traffic::stats::TrafficStats;

use super::catalog::Tracked;

/// A traffic endpoint: host, IP, or IP:port depending on the capture mode.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    /// Best name known so far. Starts as the resolver's placeholder.
    pub name: String,
    pub numeric_name: String,
    pub traffic: TrafficStats,
    main_prot: [Option<String>; LEVELS],
}

impl Node {
    pub fn new(id: NodeId, name: String) -> Self {
        Node {
            id,
            name,
            numeric_name: id.numeric_name(),
            traffic: TrafficStats::new(),
            main_prot: Default::default(),
        }
    }

    /// Counts `packet` towards this node. `direction` is `Outbound` when the
    /// node sent it; `peer_name` is the other endpoint.
    pub fn add_packet(&mut self, packet: &SharedPacket, direction: Direction, peer_name: &str) {
        self.traffic.add_packet(packet, direction, &[peer_name]);
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

    /// Cached most-used protocol at `level`, as of the last eviction pass.
    pub fn main_prot(&self, level: usize) -> Option<&str> {
        self.main_prot[level].as_deref()
    }

    pub fn main_protocols(&self) -> &[Option<String>; LEVELS] {
        &self.main_prot
    }
}

impl Tracked for Node {
    fn traffic_mut(&mut self) -> &mut TrafficStats {
        &mut self.traffic
    }

    fn refresh_main_protocols(&mut self) {
        self.main_prot = self.traffic.protocols.main_protocols();
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {:.0} bps, {} bytes, {} packets",
            self.name,
            self.numeric_name,
            self.traffic.total.average,
            self.traffic.total.accumulated,
            self.traffic.total.packets
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::packet::PacketRecord;
    use crate::traffic::protocols::ProtocolNames;
    use std::net::Ipv4Addr;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_new_node_names() {
        let id = NodeId::ipv4(Ipv4Addr::new(10, 0, 0, 1));
        let node = Node::new(id, "gateway".to_string());
        assert_eq!(node.name, "gateway");
        assert_eq!(node.numeric_name, "10.0.0.1");
        assert_eq!(node.main_prot(0), None);
    }

    #[test]
    fn test_main_prot_refreshes_on_demand() {
        let id = NodeId::ipv4(Ipv4Addr::new(10, 0, 0, 1));
        let mut node = Node::new(id, id.numeric_name());
        let packet = PacketRecord::new(
            90,
            UNIX_EPOCH + Duration::from_secs(1),
            ProtocolNames::from_stack(&["ETH_II", "IP", "UDP", "DNS"]),
        );
        node.add_packet(&packet, Direction::Outbound, "10.0.0.53");
        assert_eq!(node.main_prot(4), None);

        node.refresh_main_protocols();
        assert_eq!(node.main_prot(0), Some("DNS"));
        assert_eq!(node.main_prot(3), Some("UDP"));
        assert_eq!(node.accumulated(), 90);
        assert_eq!(node.traffic.outbound.accumulated, 90);
        assert_eq!(
            node.traffic.protocols.find(4, "DNS").unwrap().node_names(),
            vec!["10.0.0.53"]
        );
    }
}
