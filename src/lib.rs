//! Live traffic aggregation for a network visualizer: classified packets in,
//! decaying per-node, per-link and per-protocol statistics out.

pub mod aggregator;
pub mod capture;
pub mod config;
pub mod logging;
pub mod traffic;

pub use aggregator::{Aggregator, Clock};
pub use capture::{CapEvent, CapEventReceiver, CapEventSender};
pub use config::AppConfig;
pub use traffic::{EngineState, PacketEvent, Settings, TrafficSnapshot};
