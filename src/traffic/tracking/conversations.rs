use std::collections::HashMap;

use crate::traffic::node_id::{EndpointPair, NodeId};

/// Protocol hints learned for a conversation, such as a service negotiated
/// on one port and later seen on another. Keyed by the endpoint pair
/// regardless of direction; released when the link between them is evicted.
#[derive(Debug, Default)]
pub struct ConversationTable {
    entries: HashMap<EndpointPair, Vec<String>>,
}

impl ConversationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, a: NodeId, b: NodeId, protocol: &str) {
        let hints = self.entries.entry(EndpointPair::new(a, b)).or_default();
        if !hints.iter().any(|p| p == protocol) {
            hints.push(protocol.to_string());
        }
    }

    pub fn find(&self, a: NodeId, b: NodeId) -> Option<&[String]> {
        self.entries
            .get(&EndpointPair::new(a, b))
            .map(|hints| hints.as_slice())
    }

    /// Drops the hints for the pair. Returns whether any existed.
    pub fn delete_link(&mut self, a: NodeId, b: NodeId) -> bool {
        self.entries.remove(&EndpointPair::new(a, b)).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_lookup_ignores_direction() {
        let a: NodeId = "10.0.0.1".parse().unwrap();
        let b: NodeId = "10.0.0.2".parse().unwrap();
        let mut table = ConversationTable::new();
        table.add(a, b, "NFS");
        table.add(b, a, "NFS");
        table.add(b, a, "MOUNT");

        assert_eq!(table.find(b, a).unwrap(), &["NFS".to_string(), "MOUNT".to_string()]);
        assert_eq!(table.len(), 1);

        assert!(table.delete_link(a, b));
        assert!(table.find(a, b).is_none());
        assert!(!table.delete_link(a, b));
    }
}
