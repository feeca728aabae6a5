use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::traffic::Settings;

/// Sliding accumulator for one traffic direction of one entity.
///
/// # Fields
///
/// * `average` - Bit rate over the current window, in bits per second.
/// * `accumulated` - All bytes seen since the entity was created.
/// * `windowed` - Bytes of the packets still inside the window.
/// * `packets` - Packets seen since the entity was created.
/// * `last_seen` - Timestamp of the most recent packet.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicStats {
    pub average: f64,
    pub accumulated: u64,
    pub windowed: u64,
    pub packets: u64,
    pub last_seen: SystemTime,
}

impl Default for BasicStats {
    fn default() -> Self {
        BasicStats {
            average: 0.0,
            accumulated: 0,
            windowed: 0,
            packets: 0,
            last_seen: UNIX_EPOCH,
        }
    }
}

impl BasicStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, size: u32, timestamp: SystemTime) {
        self.accumulated += size as u64;
        self.windowed += size as u64;
        self.packets += 1;
        if timestamp > self.last_seen {
            self.last_seen = timestamp;
        }
    }

    pub fn sub(&mut self, size: u32) {
        assert!(
            self.windowed >= size as u64,
            "windowed bytes underflow: {} - {}",
            self.windowed,
            size
        );
        self.windowed -= size as u64;
        if self.windowed == 0 {
            self.average = 0.0;
        }
    }

    /// Recomputes the bit rate from the windowed bytes over `span`.
    pub fn recompute_average(&mut self, span: Duration) {
        assert!(!span.is_zero(), "average over an empty span");
        self.average = Settings::BPS_FACTOR * self.windowed as f64 / span.as_micros() as f64;
    }

    /// Zeroes the window-derived values of an idle entity. All-time totals stay.
    pub fn reset_average(&mut self) {
        self.windowed = 0;
        self.average = 0.0;
    }

    pub fn idle_for(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_seen).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(ms)
    }

    #[test]
    fn test_add_and_sub() {
        let mut stats = BasicStats::new();
        stats.add(100, at(10));
        stats.add(50, at(20));
        assert_eq!(stats.accumulated, 150);
        assert_eq!(stats.windowed, 150);
        assert_eq!(stats.packets, 2);
        assert_eq!(stats.last_seen, at(20));

        stats.sub(100);
        assert_eq!(stats.windowed, 50);
        assert_eq!(stats.accumulated, 150);
    }

    #[test]
    fn test_sub_to_zero_clears_average() {
        let mut stats = BasicStats::new();
        stats.add(100, at(0));
        stats.recompute_average(Duration::from_secs(1));
        assert_eq!(stats.average, 800.0);
        stats.sub(100);
        assert_eq!(stats.average, 0.0);
    }

    #[test]
    fn test_average_in_bits_per_second() {
        let mut stats = BasicStats::new();
        stats.add(1000, at(0));
        stats.add(1000, at(100));
        stats.recompute_average(Duration::from_millis(500));
        // 2000 bytes over half a second
        assert_eq!(stats.average, 32_000.0);
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn test_sub_underflow_panics() {
        let mut stats = BasicStats::new();
        stats.add(10, at(0));
        stats.sub(11);
    }

    #[test]
    #[should_panic(expected = "empty span")]
    fn test_zero_span_panics() {
        let mut stats = BasicStats::new();
        stats.add(10, at(0));
        stats.recompute_average(Duration::ZERO);
    }

    #[test]
    fn test_reset_keeps_totals() {
        let mut stats = BasicStats::new();
        stats.add(10, at(5));
        stats.sub(10);
        stats.reset_average();
        assert_eq!(stats.accumulated, 10);
        assert_eq!(stats.packets, 1);
        assert_eq!(stats.average, 0.0);
        assert_eq!(stats.idle_for(at(1005)), Duration::from_secs(1));
    }

    #[test]
    fn test_last_seen_never_goes_back() {
        let mut stats = BasicStats::new();
        stats.add(1, at(50));
        stats.add(1, at(40));
        assert_eq!(stats.last_seen, at(50));
    }
}
