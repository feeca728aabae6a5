use std::rc::Rc;
use std::time::SystemTime;

use crate::traffic::protocols::ProtocolNames;

/// Handle shared by every window holding the packet. The strong count is the
/// number of holders; the record is freed when the last window lets go.
pub type SharedPacket = Rc<PacketRecord>;

/// Single observed packet. Immutable once created.
///
/// # Fields
///
/// * `size` - Bytes on the wire.
/// * `timestamp` - Capture time.
/// * `names` - Protocol names per stack level.
#[derive(Debug, PartialEq, Eq)]
pub struct PacketRecord {
    pub size: u32,
    pub timestamp: SystemTime,
    pub names: ProtocolNames,
}

impl PacketRecord {
    pub fn new(size: u32, timestamp: SystemTime, names: ProtocolNames) -> SharedPacket {
        Rc::new(PacketRecord {
            size,
            timestamp,
            names,
        })
    }

    /// Age relative to `now`. Packets stamped after `now` are treated as new.
    pub fn age(&self, now: SystemTime) -> std::time::Duration {
        now.duration_since(self.timestamp).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_age() {
        let ts = UNIX_EPOCH + Duration::from_secs(10);
        let packet = PacketRecord::new(60, ts, ProtocolNames::unknown());
        assert_eq!(packet.age(ts + Duration::from_millis(1500)), Duration::from_millis(1500));
        assert_eq!(packet.age(ts - Duration::from_secs(1)), Duration::ZERO);
    }

    #[test]
    fn test_shared_count() {
        let packet = PacketRecord::new(60, UNIX_EPOCH, ProtocolNames::unknown());
        assert_eq!(Rc::strong_count(&packet), 1);
        let held = Rc::clone(&packet);
        assert_eq!(Rc::strong_count(&packet), 2);
        drop(held);
        assert_eq!(Rc::strong_count(&packet), 1);
    }
}
