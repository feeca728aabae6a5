use serde::Serialize;

/// Which side of an entity a window membership counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The entity is the packet's destination.
    Inbound,
    /// The entity is the packet's source.
    Outbound,
    /// Direction-free views: links and the protocol summary.
    Either,
}
