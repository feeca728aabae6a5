use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, trace};

use crate::config::EngineConfig;

use super::event::PacketEvent;
use super::eviction::{purge_entity, queue_removal, EvictionReport, PurgeOutcome, PurgePolicy};
use super::node_id::{LinkId, NodeId};
use super::packet::{Direction, PacketRecord, SharedPacket};
use super::resolver::{NameResolver, NumericResolver};
use super::stats::TrafficStats;
use super::tracking::{ConversationTable, EntityCatalog, Link, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Stopped,
    Playing,
    Paused,
}

/// Everything one capture session knows: both catalogs, the global protocol
/// summary and the logical clock.
///
/// Single-threaded: each `ingest` and each `run_eviction` runs to completion
/// before readers look at the catalogs again.
pub struct EngineState {
    config: EngineConfig,
    state: CaptureState,
    now: SystemTime,
    last_packet: SystemTime,
    nodes: EntityCatalog<NodeId, Node>,
    links: EntityCatalog<LinkId, Link>,
    summary: TrafficStats,
    conversations: ConversationTable,
    resolver: Box<dyn NameResolver>,
    ingested: u64,
}

impl EngineState {
    /// A session ready to ingest, naming nodes numerically.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_resolver(config, Box::new(NumericResolver))
    }

    pub fn with_resolver(config: EngineConfig, resolver: Box<dyn NameResolver>) -> Self {
        EngineState {
            config,
            state: CaptureState::Playing,
            now: UNIX_EPOCH,
            last_packet: UNIX_EPOCH,
            nodes: EntityCatalog::new("node"),
            links: EntityCatalog::new("link"),
            summary: TrafficStats::new(),
            conversations: ConversationTable::new(),
            resolver,
            ingested: 0,
        }
    }

    pub fn start(&mut self) {
        info!("Capture started");
        self.state = CaptureState::Playing;
    }

    pub fn pause(&mut self) {
        info!("Capture paused");
        self.state = CaptureState::Paused;
    }

    /// The next eviction pass drains every window and removes every entity.
    pub fn stop(&mut self) {
        info!("Capture stopped");
        self.state = CaptureState::Stopped;
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> SystemTime {
        self.now
    }

    pub fn ingested(&self) -> u64 {
        self.ingested
    }

    /// Counts one packet towards its source, destination, link and the
    /// protocol summary. Ignored unless capturing.
    pub fn ingest(&mut self, event: PacketEvent) -> bool {
        if self.state != CaptureState::Playing {
            trace!("Ignoring packet while {:?}", self.state);
            return false;
        }

        // Windows expire from the tail and rely on time order.
        let timestamp = event.timestamp.max(self.last_packet);
        self.last_packet = timestamp;
        if timestamp > self.now {
            self.now = timestamp;
        }

        let packet = PacketRecord::new(event.size, timestamp, event.names);

        // Nodes first: a link is only ever created between known nodes.
        let src_name = self.ensure_node(event.src);
        let dst_name = self.ensure_node(event.dst);

        self.summary.add_packet(
            &packet,
            Direction::Either,
            &[src_name.as_str(), dst_name.as_str()],
        );
        if let Some(src) = self.nodes.find_mut(&event.src) {
            src.add_packet(&packet, Direction::Outbound, &dst_name);
        }
        if let Some(dst) = self.nodes.find_mut(&event.dst) {
            dst.add_packet(&packet, Direction::Inbound, &src_name);
        }
        self.add_link_packet(event.link, &packet);

        self.ingested += 1;
        true
    }

    fn ensure_node(&mut self, id: NodeId) -> String {
        let resolver = &mut self.resolver;
        let node = self.nodes.find_or_create(id, || {
            let name = resolver.request_name(&id);
            Node::new(id, name)
        });
        node.name.clone()
    }

    fn add_link_packet(&mut self, id: LinkId, packet: &SharedPacket) {
        if !self.links.contains(&id) {
            let src_name = self.nodes.find(&id.src()).map(|n| n.name.clone());
            let dst_name = self.nodes.find(&id.dst()).map(|n| n.name.clone());
            let (src_name, dst_name) = match (src_name, dst_name) {
                (Some(src), Some(dst)) => (src, dst),
                _ => panic!("link {} created before its endpoint nodes", id),
            };
            self.links
                .find_or_create(id, || Link::new(id, src_name, dst_name));
        }
        if let Some(link) = self.links.find_mut(&id) {
            link.add_packet(packet);
        }
    }

    /// One eviction tick at time `now`.
    ///
    /// Phase A walks nodes, then links, expiring packets and collecting the
    /// keys of timed-out entities. Phase B removes them. Removing a node
    /// leaves its links alone; they go on their own timeout.
    pub fn run_eviction(&mut self, now: SystemTime) -> EvictionReport {
        if now > self.now {
            self.now = now;
        }
        let now = self.now;
        let stopped = self.state == CaptureState::Stopped;
        let mut report = EvictionReport::default();

        report.packets_expired += self.purge_summary(now, stopped);

        let node_policy = PurgePolicy {
            averaging_time: self.config.averaging_time,
            entity_timeout: self.config.node_timeout,
            proto_timeout: self.config.proto_node_timeout,
            stopped,
        };
        let mut doomed_nodes = Vec::new();
        for (id, node) in self.nodes.iter_mut() {
            let (outcome, expired) = purge_entity(node, now, &node_policy);
            report.packets_expired += expired;
            if outcome == PurgeOutcome::Expired {
                queue_removal(&mut doomed_nodes, *id);
            }
        }

        let link_policy = PurgePolicy {
            entity_timeout: self.config.link_timeout,
            ..node_policy
        };
        let mut doomed_links = Vec::new();
        for (id, link) in self.links.iter_mut() {
            let (outcome, expired) = purge_entity(link, now, &link_policy);
            report.packets_expired += expired;
            if outcome == PurgeOutcome::Expired {
                queue_removal(&mut doomed_links, *id);
            }
            if let Some(src) = self.nodes.find(&id.src()) {
                link.src_name.clone_from(&src.name);
            }
            if let Some(dst) = self.nodes.find(&id.dst()) {
                link.dst_name.clone_from(&dst.name);
            }
        }

        for id in doomed_nodes {
            if let Some(node) = self.nodes.remove(&id) {
                self.summary.protocols.forget_name(&node.name);
                self.summary.protocols.forget_name(&node.numeric_name);
                report.nodes_removed += 1;
            }
        }
        for id in doomed_links {
            if self.links.remove(&id).is_some() {
                report.links_removed += 1;
            }
            if self.conversations.delete_link(id.src(), id.dst()) {
                trace!("Released conversation hints for {}", id);
            }
        }

        report.nodes_left = self.nodes.len();
        report.links_left = self.links.len();
        debug!("Eviction pass: {:?}", report);
        report
    }

    fn purge_summary(&mut self, now: SystemTime, stopped: bool) -> usize {
        let expired = self
            .summary
            .purge_expired(now, self.config.averaging_time, stopped);
        if self.summary.is_empty() {
            self.summary.reset_averages();
        } else {
            self.summary.update_averages(now);
        }
        self.summary
            .protocols
            .purge_expired(now, self.config.proto_timeout);
        expired
    }

    /// Called when the resolver learns a better name. Statistics are not touched.
    pub fn update_display_name(&mut self, id: &NodeId, name: &str) -> bool {
        match self.nodes.find_mut(id) {
            Some(node) => {
                debug!("Node {} is now known as {}", id, name);
                node.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn add_conversation(&mut self, a: NodeId, b: NodeId, protocol: &str) {
        self.conversations.add(a, b, protocol);
    }

    pub fn conversations(&self) -> &ConversationTable {
        &self.conversations
    }

    pub fn find_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.find(id)
    }

    pub fn find_link(&self, id: &LinkId) -> Option<&Link> {
        self.links.find(id)
    }

    pub fn nodes(&self) -> &EntityCatalog<NodeId, Node> {
        &self.nodes
    }

    pub fn links(&self) -> &EntityCatalog<LinkId, Link> {
        &self.links
    }

    pub fn for_each_node<F: FnMut(&NodeId, &Node)>(&self, f: F) {
        self.nodes.for_each(f);
    }

    pub fn for_each_link<F: FnMut(&LinkId, &Link)>(&self, f: F) {
        self.links.for_each(f);
    }

    /// Links whose endpoints are both still known. The rest are hidden.
    pub fn visible_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter_map(move |(id, link)| {
            (self.nodes.contains(&id.src()) && self.nodes.contains(&id.dst())).then_some(link)
        })
    }

    /// Global protocol summary across all traffic.
    pub fn summary(&self) -> &TrafficStats {
        &self.summary
    }

    pub fn pop_new_node(&mut self) -> Option<NodeId> {
        self.nodes.pop_new_entity()
    }

    pub fn pop_new_link(&mut self) -> Option<LinkId> {
        self.links.pop_new_entity()
    }
}
