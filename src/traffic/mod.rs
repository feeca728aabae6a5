//! Traffic aggregation and eviction: per-node, per-link and per-protocol
//! views of recent traffic that decay as packets age out.

pub mod engine;
pub mod event;
pub mod eviction;
pub mod node_id;
pub mod packet;
pub mod protocols;
pub mod resolver;
pub mod settings;
pub mod snapshot;
pub mod stats;
pub mod tracking;

pub use engine::{CaptureState, EngineState};
pub use event::PacketEvent;
pub use eviction::EvictionReport;
pub use node_id::{CaptureMode, LinkId, NodeId};
pub use settings::Settings;
pub use snapshot::TrafficSnapshot;
