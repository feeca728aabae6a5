use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::engine::EngineState;
use super::node_id::NodeId;
use super::protocols::{ProtocolEntry, LEVELS};
use super::stats::BasicStats;
use super::tracking::{Link, Node};

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsSnapshot {
    pub average_bps: f64,
    pub accumulated_bytes: u64,
    pub windowed_bytes: u64,
    pub packets: u64,
    pub last_heard: String,
}

impl From<&BasicStats> for StatsSnapshot {
    fn from(stats: &BasicStats) -> Self {
        StatsSnapshot {
            average_bps: stats.average,
            accumulated_bytes: stats.accumulated,
            windowed_bytes: stats.windowed,
            packets: stats.packets,
            last_heard: rfc3339(stats.last_seen),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub numeric_name: String,
    pub total: StatsSnapshot,
    pub inbound: StatsSnapshot,
    pub outbound: StatsSnapshot,
    /// Most-used protocol per stack level, level 0 first.
    pub protocols: Vec<Option<String>>,
}

impl From<&Node> for NodeSnapshot {
    fn from(node: &Node) -> Self {
        NodeSnapshot {
            id: node.id,
            name: node.name.clone(),
            numeric_name: node.numeric_name.clone(),
            total: (&node.traffic.total).into(),
            inbound: (&node.traffic.inbound).into(),
            outbound: (&node.traffic.outbound).into(),
            protocols: node.main_protocols().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LinkSnapshot {
    pub src: NodeId,
    pub dst: NodeId,
    pub src_name: String,
    pub dst_name: String,
    /// False when an endpoint node has been evicted.
    pub visible: bool,
    pub stats: StatsSnapshot,
    pub protocols: Vec<Option<String>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProtocolSnapshot {
    pub level: usize,
    pub name: String,
    pub accumulated_bytes: u64,
    pub windowed_bytes: u64,
    pub packets: u64,
    pub last_heard: String,
    pub node_names: Vec<String>,
}

impl ProtocolSnapshot {
    fn new(level: usize, entry: &ProtocolEntry) -> Self {
        ProtocolSnapshot {
            level,
            name: entry.name.clone(),
            accumulated_bytes: entry.accumulated,
            windowed_bytes: entry.windowed,
            packets: entry.packets,
            last_heard: rfc3339(entry.last_seen),
            node_names: entry.node_names().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Read-only copy of the catalogs between two passes, for export.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrafficSnapshot {
    pub taken_at: String,
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
    pub protocols: Vec<ProtocolSnapshot>,
}

impl TrafficSnapshot {
    pub fn capture(engine: &EngineState) -> Self {
        let nodes = engine
            .nodes()
            .iter()
            .map(|(_, node)| NodeSnapshot::from(node))
            .collect();
        let links = engine
            .links()
            .iter()
            .map(|(_, link)| link_snapshot(engine, link))
            .collect();
        let stack = &engine.summary().protocols;
        let protocols = (0..LEVELS)
            .flat_map(|level| {
                stack
                    .level(level)
                    .into_iter()
                    .map(move |entry| ProtocolSnapshot::new(level, entry))
            })
            .collect();
        TrafficSnapshot {
            taken_at: rfc3339(engine.now()),
            nodes,
            links,
            protocols,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn link_snapshot(engine: &EngineState, link: &Link) -> LinkSnapshot {
    let visible = engine.find_node(&link.id.src()).is_some() && engine.find_node(&link.id.dst()).is_some();
    LinkSnapshot {
        src: link.id.src(),
        dst: link.id.dst(),
        src_name: link.src_name.clone(),
        dst_name: link.dst_name.clone(),
        visible,
        stats: (&link.traffic.total).into(),
        protocols: link.main_protocols().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::traffic::event::PacketEvent;
    use crate::traffic::protocols::ProtocolNames;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_snapshot_json() {
        let mut engine = EngineState::new(EngineConfig::default());
        let a: NodeId = "10.0.0.1".parse().unwrap();
        let b: NodeId = "10.0.0.2".parse().unwrap();
        engine.ingest(PacketEvent::new(
            a,
            b,
            1500,
            UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            ProtocolNames::from_stack(&["ETH_II", "IP", "TCP"]),
        ));
        engine.run_eviction(UNIX_EPOCH + Duration::from_millis(1_700_000_000_500));

        let snapshot = TrafficSnapshot::capture(&engine);
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].id, a);
        assert_eq!(snapshot.nodes[0].outbound.accumulated_bytes, 1500);
        assert_eq!(snapshot.nodes[0].protocols[3], Some("TCP".to_string()));
        assert!(snapshot.links[0].visible);
        assert_eq!(snapshot.links[0].stats.average_bps, 24_000.0);
        assert_eq!(snapshot.protocols[0].level, 0);
        assert_eq!(snapshot.protocols[0].name, "TCP");

        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(json["nodes"][1]["id"], "10.0.0.2");
        assert_eq!(json["links"][0]["src_name"], "10.0.0.1");
        assert_eq!(json["nodes"][0]["total"]["last_heard"], "2023-11-14T22:13:20+00:00");
        assert_eq!(json["taken_at"], "2023-11-14T22:13:20.500+00:00");
    }
}
