use std::collections::{BTreeMap, VecDeque};
use std::fmt::Display;

use log::{debug, trace};

use crate::traffic::stats::TrafficStats;

/// An entity whose traffic lives in a `TrafficStats`.
pub trait Tracked {
    fn traffic_mut(&mut self) -> &mut TrafficStats;
    /// Refreshes the cached most-used protocol per level.
    fn refresh_main_protocols(&mut self);
}

/// Ordered key → entity map owning every tracked entity of one kind.
///
/// Iteration follows key order so eviction passes visit entities
/// deterministically. Newly created keys are queued until the display side
/// pops them.
#[derive(Debug)]
pub struct EntityCatalog<K, V> {
    kind: &'static str,
    entries: BTreeMap<K, V>,
    new_entities: VecDeque<K>,
}

impl<K, V> EntityCatalog<K, V>
where
    K: Ord + Clone + Display,
    V: Tracked,
{
    pub fn new(kind: &'static str) -> Self {
        EntityCatalog {
            kind,
            entries: BTreeMap::new(),
            new_entities: VecDeque::new(),
        }
    }

    pub fn find(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn find_or_create<F>(&mut self, key: K, factory: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        if !self.entries.contains_key(&key) {
            debug!("New {}: {}", self.kind, key);
            self.enqueue_new_entity(key.clone());
        }
        self.entries.entry(key).or_insert_with(factory)
    }

    /// Removes the entity after releasing every packet it still holds.
    /// Absent keys are ignored.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut entity = self.entries.remove(key)?;
        let released = entity.traffic_mut().release_all();
        self.new_entities.retain(|k| k != key);
        trace!("Removed {} {} ({} packets released)", self.kind, key, released);
        Some(entity)
    }

    /// Queues a creation notification for the display side.
    pub fn enqueue_new_entity(&mut self, key: K) {
        self.new_entities.push_back(key);
    }

    /// Oldest creation notification not yet consumed.
    pub fn pop_new_entity(&mut self) -> Option<K> {
        self.new_entities.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for (key, entity) in self.entries.iter() {
            f(key, entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::packet::{Direction, PacketRecord};
    use crate::traffic::protocols::ProtocolNames;
    use std::rc::Rc;
    use std::time::UNIX_EPOCH;

    #[derive(Debug, Default)]
    struct Dummy {
        traffic: TrafficStats,
        refreshed: u32,
    }

    impl Tracked for Dummy {
        fn traffic_mut(&mut self) -> &mut TrafficStats {
            &mut self.traffic
        }

        fn refresh_main_protocols(&mut self) {
            self.refreshed += 1;
        }
    }

    #[test]
    fn test_find_or_create_once() {
        let mut catalog: EntityCatalog<u32, Dummy> = EntityCatalog::new("dummy");
        catalog.find_or_create(7, Dummy::default).refreshed = 3;
        let again = catalog.find_or_create(7, || panic!("factory called twice"));
        assert_eq!(again.refreshed, 3);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.pop_new_entity(), Some(7));
        assert_eq!(catalog.pop_new_entity(), None);
    }

    #[test]
    fn test_iteration_is_ordered() {
        let mut catalog: EntityCatalog<u32, Dummy> = EntityCatalog::new("dummy");
        for key in [5, 1, 9, 3] {
            catalog.find_or_create(key, Dummy::default);
        }
        let keys: Vec<u32> = catalog.keys().copied().collect();
        assert_eq!(keys, vec![1, 3, 5, 9]);

        let mut seen = Vec::new();
        catalog.for_each(|k, _| seen.push(*k));
        assert_eq!(seen, keys);
    }

    #[test]
    fn test_remove_releases_packets_and_notifications() {
        let mut catalog: EntityCatalog<u32, Dummy> = EntityCatalog::new("dummy");
        let packet = PacketRecord::new(10, UNIX_EPOCH, ProtocolNames::unknown());
        catalog
            .find_or_create(1, Dummy::default)
            .traffic
            .add_packet(&packet, Direction::Either, &[]);
        catalog.find_or_create(2, Dummy::default);
        assert_eq!(Rc::strong_count(&packet), 2);

        let removed = catalog.remove(&1).unwrap();
        assert!(removed.traffic.is_empty());
        assert_eq!(Rc::strong_count(&packet), 1);
        assert!(catalog.find(&1).is_none());
        assert_eq!(catalog.pop_new_entity(), Some(2));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut catalog: EntityCatalog<u32, Dummy> = EntityCatalog::new("dummy");
        assert!(catalog.remove(&42).is_none());
        assert!(catalog.is_empty());
    }
}
