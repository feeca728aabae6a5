mod basic_stats;
mod traffic_stats;

pub use basic_stats::BasicStats;
pub use traffic_stats::TrafficStats;
