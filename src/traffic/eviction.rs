use std::time::{Duration, SystemTime};

use log::trace;

use super::tracking::Tracked;

/// Per-catalog parameters of one eviction pass.
#[derive(Debug, Clone, Copy)]
pub struct PurgePolicy {
    pub averaging_time: Duration,
    /// Idle time before a traffic-free entity is removed. Zero disables.
    pub entity_timeout: Duration,
    /// Idle time before a protocol entry is dropped. Zero disables.
    pub proto_timeout: Duration,
    /// Capture stopped: drain every window and remove every idle entity.
    pub stopped: bool,
}

impl PurgePolicy {
    /// Packets older than this leave the window. An entity set to disappear
    /// sooner than the averaging window must not keep stale bytes longer.
    pub fn comparison_interval(&self) -> Duration {
        if self.entity_timeout.is_zero() {
            self.averaging_time
        } else {
            self.entity_timeout.min(self.averaging_time)
        }
    }

    pub fn timed_out(&self, idle: Duration) -> bool {
        self.stopped || (!self.entity_timeout.is_zero() && idle > self.entity_timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// Packets remain; averages and protocol caches are fresh.
    Active,
    /// No packets left but still within the timeout.
    Idle,
    /// No packets left and timed out: remove after the pass.
    Expired,
}

/// Phase A for one entity. Never touches the catalog holding it.
/// Returns the outcome and the number of packets released.
pub fn purge_entity<V: Tracked>(
    entity: &mut V,
    now: SystemTime,
    policy: &PurgePolicy,
) -> (PurgeOutcome, usize) {
    let traffic = entity.traffic_mut();
    let expired = traffic.purge_expired(now, policy.comparison_interval(), policy.stopped);

    if !traffic.is_empty() {
        traffic.update_averages(now);
        traffic.protocols.purge_expired(now, policy.proto_timeout);
        entity.refresh_main_protocols();
        return (PurgeOutcome::Active, expired);
    }

    let idle = traffic.total.idle_for(now);
    if policy.timed_out(idle) {
        trace!("Entity idle for {:?}, queued for removal", idle);
        (PurgeOutcome::Expired, expired)
    } else {
        traffic.reset_averages();
        // Drained stack: clears the cached protocols too.
        entity.refresh_main_protocols();
        (PurgeOutcome::Idle, expired)
    }
}

/// Queues `key` for phase B. Keys come from an ordered walk, so a key that
/// does not sort after the previous one has been queued before.
pub fn queue_removal<K: Ord + std::fmt::Display>(queue: &mut Vec<K>, key: K) {
    if let Some(last) = queue.last() {
        assert!(*last < key, "{} queued for removal twice", key);
    }
    queue.push(key);
}

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub packets_expired: usize,
    pub nodes_removed: usize,
    pub links_removed: usize,
    pub nodes_left: usize,
    pub links_left: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::node_id::NodeId;
    use crate::traffic::packet::{Direction, PacketRecord};
    use crate::traffic::protocols::ProtocolNames;
    use crate::traffic::tracking::Node;
    use std::time::UNIX_EPOCH;

    fn at(ms: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(ms)
    }

    fn policy(timeout_ms: u64) -> PurgePolicy {
        PurgePolicy {
            averaging_time: Duration::from_millis(2000),
            entity_timeout: Duration::from_millis(timeout_ms),
            proto_timeout: Duration::from_secs(60),
            stopped: false,
        }
    }

    fn node_with_packet(size: u32, ms: u64) -> Node {
        let id: NodeId = "10.0.0.1".parse().unwrap();
        let mut node = Node::new(id, id.numeric_name());
        let packet = PacketRecord::new(size, at(ms), ProtocolNames::from_stack(&["ETH_II", "IP"]));
        node.add_packet(&packet, Direction::Outbound, "peer");
        node
    }

    #[test]
    fn test_comparison_interval() {
        assert_eq!(policy(0).comparison_interval(), Duration::from_millis(2000));
        assert_eq!(policy(500).comparison_interval(), Duration::from_millis(500));
        assert_eq!(policy(60_000).comparison_interval(), Duration::from_millis(2000));
    }

    #[test]
    fn test_active_entity_gets_averages_and_cache() {
        let mut node = node_with_packet(1000, 0);
        let (outcome, expired) = purge_entity(&mut node, at(1000), &policy(60_000));
        assert_eq!(outcome, PurgeOutcome::Active);
        assert_eq!(expired, 0);
        assert_eq!(node.average(), 8000.0);
        assert_eq!(node.main_prot(2), Some("IP"));
    }

    #[test]
    fn test_idle_entity_kept_with_zero_average() {
        let mut node = node_with_packet(1000, 0);
        purge_entity(&mut node, at(1000), &policy(60_000));
        let (outcome, expired) = purge_entity(&mut node, at(3000), &policy(60_000));
        assert_eq!(outcome, PurgeOutcome::Idle);
        assert_eq!(expired, 1);
        assert_eq!(node.average(), 0.0);
        assert_eq!(node.accumulated(), 1000);
        assert_eq!(node.main_prot(2), None);
        assert!(node.main_protocols().iter().all(Option::is_none));
    }

    #[test]
    fn test_expired_after_timeout() {
        let mut node = node_with_packet(1000, 0);
        let (outcome, _) = purge_entity(&mut node, at(5001), &policy(5000));
        assert_eq!(outcome, PurgeOutcome::Expired);
    }

    #[test]
    fn test_disabled_timeout_never_expires() {
        let mut node = node_with_packet(1000, 0);
        let (outcome, _) = purge_entity(&mut node, at(10_000_000), &policy(0));
        assert_eq!(outcome, PurgeOutcome::Idle);
    }

    #[test]
    fn test_stopped_drains_fresh_packets() {
        let mut node = node_with_packet(1000, 0);
        let stopped = PurgePolicy {
            stopped: true,
            ..policy(0)
        };
        let (outcome, expired) = purge_entity(&mut node, at(0), &stopped);
        assert_eq!(outcome, PurgeOutcome::Expired);
        assert_eq!(expired, 1);
        assert_eq!(node.traffic.total.windowed, 0);
    }

    #[test]
    #[should_panic(expected = "queued for removal twice")]
    fn test_duplicate_removal_panics() {
        let mut queue = Vec::new();
        queue_removal(&mut queue, 3u32);
        queue_removal(&mut queue, 3u32);
    }
}
