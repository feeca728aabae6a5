use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use super::names::{ProtocolNames, LEVELS};

#[derive(Debug, Clone, PartialEq)]
struct NameSeen {
    order: u64,
    last_seen: SystemTime,
}

/// Traffic carried by one protocol at one stack level of one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolEntry {
    pub name: String,
    pub accumulated: u64,
    pub windowed: u64,
    pub packets: u64,
    pub last_seen: SystemTime,
    names: HashMap<String, NameSeen>,
    next_name: u64,
    seq: u64,
    /// Index of the packet that created the entry, in the owner's add order.
    first_packet: u64,
}

impl ProtocolEntry {
    fn new(name: &str, seq: u64, first_packet: u64, timestamp: SystemTime) -> Self {
        ProtocolEntry {
            name: name.to_string(),
            accumulated: 0,
            windowed: 0,
            packets: 0,
            last_seen: timestamp,
            names: HashMap::new(),
            next_name: 0,
            seq,
            first_packet,
        }
    }

    fn add_name(&mut self, name: &str, timestamp: SystemTime) {
        match self.names.get_mut(name) {
            Some(seen) => seen.last_seen = seen.last_seen.max(timestamp),
            None => {
                self.names.insert(
                    name.to_string(),
                    NameSeen {
                        order: self.next_name,
                        last_seen: timestamp,
                    },
                );
                self.next_name += 1;
            }
        }
    }

    /// Distinct remote display names seen under this protocol, in first-seen order.
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<(&String, &NameSeen)> = self.names.iter().collect();
        names.sort_by_key(|(_, seen)| seen.order);
        names.into_iter().map(|(name, _)| name.as_str()).collect()
    }

    fn prune_names(&mut self, now: SystemTime, interval: Duration) {
        self.names
            .retain(|_, seen| now.duration_since(seen.last_seen).unwrap_or_default() <= interval);
    }
}

/// Per-level protocol dictionaries for one owner (a node, a link, or the
/// global summary).
///
/// The owner subtracts packets in the order it added them, so the n-th
/// `sub_packet` undoes the n-th `add_packet`.
#[derive(Debug)]
pub struct ProtocolStack {
    levels: [HashMap<String, ProtocolEntry>; LEVELS],
    next_seq: u64,
    added: u64,
    subtracted: u64,
}

impl Default for ProtocolStack {
    fn default() -> Self {
        ProtocolStack {
            levels: Default::default(),
            next_seq: 0,
            added: 0,
            subtracted: 0,
        }
    }
}

impl ProtocolStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_packet(
        &mut self,
        names: &ProtocolNames,
        size: u32,
        timestamp: SystemTime,
        remote_names: &[&str],
    ) {
        let packet_index = self.added;
        self.added += 1;
        let next_seq = &mut self.next_seq;
        for (level, name) in names.iter() {
            let entry = self.levels[level]
                .entry(name.to_string())
                .or_insert_with(|| {
                    let seq = *next_seq;
                    *next_seq += 1;
                    ProtocolEntry::new(name, seq, packet_index, timestamp)
                });
            entry.accumulated += size as u64;
            entry.windowed += size as u64;
            entry.packets += 1;
            if timestamp > entry.last_seen {
                entry.last_seen = timestamp;
            }
            for remote in remote_names {
                entry.add_name(remote, timestamp);
            }
        }
    }

    /// Undoes the oldest packet not yet subtracted. Entries purged and
    /// recreated since that packet was added do not hold its bytes and are
    /// left alone.
    pub fn sub_packet(&mut self, names: &ProtocolNames, size: u32) {
        let packet_index = self.subtracted;
        self.subtracted += 1;
        for (level, name) in names.iter() {
            let drained = match self.levels[level].get_mut(name) {
                Some(entry) if entry.first_packet <= packet_index => {
                    entry.windowed = entry.windowed.saturating_sub(size as u64);
                    entry.windowed == 0
                }
                _ => continue,
            };
            if drained {
                self.levels[level].remove(name);
            }
        }
    }

    /// The protocol carrying the most windowed bytes at `level`. Ties go to
    /// the entry created first.
    pub fn most_used(&self, level: usize) -> Option<&str> {
        self.levels[level]
            .values()
            .max_by(|a, b| a.windowed.cmp(&b.windowed).then(b.seq.cmp(&a.seq)))
            .map(|entry| entry.name.as_str())
    }

    /// `most_used` for every level, owned, for caching on the entity.
    pub fn main_protocols(&self) -> [Option<String>; LEVELS] {
        std::array::from_fn(|level| self.most_used(level).map(str::to_string))
    }

    /// Drops entries, and remote names within entries, not refreshed within
    /// `interval`. Zero disables.
    pub fn purge_expired(&mut self, now: SystemTime, interval: Duration) -> usize {
        if interval.is_zero() {
            return 0;
        }
        let mut removed = 0;
        for level in self.levels.iter_mut() {
            level.retain(|_, entry| {
                let keep = now.duration_since(entry.last_seen).unwrap_or_default() <= interval;
                if keep {
                    entry.prune_names(now, interval);
                } else {
                    removed += 1;
                }
                keep
            });
        }
        removed
    }

    /// Drops a remote name from every entry, e.g. once its node is gone.
    pub fn forget_name(&mut self, name: &str) {
        for entry in self.levels.iter_mut().flat_map(|level| level.values_mut()) {
            entry.names.remove(name);
        }
    }

    pub fn find(&self, level: usize, name: &str) -> Option<&ProtocolEntry> {
        self.levels[level].get(name)
    }

    /// Entries of one level in creation order.
    pub fn level(&self, level: usize) -> Vec<&ProtocolEntry> {
        let mut entries: Vec<&ProtocolEntry> = self.levels[level].values().collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(|level| level.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn at(ms: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(ms)
    }

    #[test]
    fn test_add_fills_every_level() {
        let mut stack = ProtocolStack::new();
        let names = ProtocolNames::from_stack(&["TCP", "IP"]);
        stack.add_packet(&names, 100, at(0), &["peer"]);

        assert_eq!(stack.most_used(1), Some("TCP"));
        assert_eq!(stack.most_used(2), Some("IP"));
        assert_eq!(stack.most_used(0), Some("IP"));
        assert_eq!(stack.most_used(3), Some("UNKNOWN"));

        let tcp = stack.find(1, "TCP").unwrap();
        assert_eq!(tcp.accumulated, 100);
        assert_eq!(tcp.windowed, 100);
        assert_eq!(tcp.packets, 1);
        assert_eq!(tcp.node_names(), vec!["peer"]);
    }

    #[test]
    fn test_sub_removes_drained_entries() {
        let mut stack = ProtocolStack::new();
        let tcp = ProtocolNames::from_stack(&["ETH_II", "IP", "TCP"]);
        let udp = ProtocolNames::from_stack(&["ETH_II", "IP", "UDP"]);
        stack.add_packet(&tcp, 100, at(0), &[]);
        stack.add_packet(&udp, 40, at(1), &[]);

        stack.sub_packet(&tcp, 100);
        assert!(stack.find(3, "TCP").is_none());
        assert_eq!(stack.find(2, "IP").unwrap().windowed, 40);
        assert_eq!(stack.most_used(3), Some("UDP"));

        stack.sub_packet(&udp, 40);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_sub_of_purged_entry_is_skipped() {
        let mut stack = ProtocolStack::new();
        let names = ProtocolNames::from_stack(&["ETH_II"]);
        stack.add_packet(&names, 10, at(0), &[]);
        assert_eq!(stack.purge_expired(at(5000), Duration::from_secs(1)), LEVELS);
        stack.sub_packet(&names, 10);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_most_used_tie_keeps_first() {
        let mut stack = ProtocolStack::new();
        stack.add_packet(&ProtocolNames::from_stack(&["ARP"]), 60, at(0), &[]);
        stack.add_packet(&ProtocolNames::from_stack(&["IP"]), 60, at(1), &[]);
        assert_eq!(stack.most_used(1), Some("ARP"));
        stack.add_packet(&ProtocolNames::from_stack(&["IP"]), 1, at(2), &[]);
        assert_eq!(stack.most_used(1), Some("IP"));
    }

    #[test]
    fn test_purge_expired_ignores_live_packets() {
        let mut stack = ProtocolStack::new();
        stack.add_packet(&ProtocolNames::from_stack(&["ETH_II", "ARP"]), 60, at(0), &[]);
        stack.add_packet(&ProtocolNames::from_stack(&["ETH_II", "IP"]), 60, at(9000), &[]);
        stack.purge_expired(at(10_000), Duration::from_secs(5));

        assert!(stack.find(2, "ARP").is_none());
        assert!(stack.find(2, "IP").is_some());
        assert_eq!(stack.find(1, "ETH_II").unwrap().windowed, 120);
    }

    #[test]
    fn test_zero_interval_disables_purge() {
        let mut stack = ProtocolStack::new();
        stack.add_packet(&ProtocolNames::from_stack(&["ETH_II"]), 60, at(0), &[]);
        assert_eq!(stack.purge_expired(at(1_000_000), Duration::ZERO), 0);
        assert!(!stack.is_empty());
    }

    #[test]
    fn test_names_are_distinct_and_ordered() {
        let mut stack = ProtocolStack::new();
        let names = ProtocolNames::from_stack(&["UDP"]);
        stack.add_packet(&names, 1, at(0), &["b", "a"]);
        stack.add_packet(&names, 1, at(1), &["a", "c"]);
        assert_eq!(stack.find(1, "UDP").unwrap().node_names(), vec!["b", "a", "c"]);
        let level: Vec<&str> = stack.level(1).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(level, vec!["UDP"]);
    }

    #[test]
    fn test_recreated_entry_keeps_newer_bytes() {
        let mut stack = ProtocolStack::new();
        let arp = ProtocolNames::from_stack(&["ETH_II", "ARP"]);
        stack.add_packet(&arp, 100, at(0), &[]);
        stack.purge_expired(at(6000), Duration::from_secs(5));
        assert!(stack.is_empty());

        stack.add_packet(&arp, 50, at(7000), &[]);
        // The first packet leaves the window; its entries are gone already.
        stack.sub_packet(&arp, 100);
        assert_eq!(stack.find(2, "ARP").unwrap().windowed, 50);
        assert_eq!(stack.most_used(2), Some("ARP"));

        stack.sub_packet(&arp, 50);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_names_pruned_by_age_and_forgotten() {
        let mut stack = ProtocolStack::new();
        let names = ProtocolNames::from_stack(&["UDP"]);
        stack.add_packet(&names, 1, at(0), &["old"]);
        stack.add_packet(&names, 1, at(9000), &["fresh", "server"]);
        stack.purge_expired(at(10_000), Duration::from_secs(5));
        assert_eq!(stack.find(1, "UDP").unwrap().node_names(), vec!["fresh", "server"]);

        stack.forget_name("fresh");
        assert_eq!(stack.find(1, "UDP").unwrap().node_names(), vec!["server"]);
    }
}
