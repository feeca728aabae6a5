use std::fmt::{self, Display};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use pnet::util::MacAddr;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// How nodes are identified for a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    Link,
    Ip,
    Tcp,
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "link" | "ethernet" => Ok(CaptureMode::Link),
            "ip" => Ok(CaptureMode::Ip),
            "tcp" | "port" => Ok(CaptureMode::Tcp),
            other => Err(format!("invalid capture mode: {}", other)),
        }
    }
}

impl Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::Link => write!(f, "link"),
            CaptureMode::Ip => write!(f, "ip"),
            CaptureMode::Tcp => write!(f, "tcp"),
        }
    }
}

/// Identity of a traffic endpoint.
///
/// The derived ordering compares the mode tag first (variant order), then the
/// address bytes lexicographically. Ports compare numerically, which is the
/// same as comparing their big-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    LinkLayer([u8; 6]),
    Ipv4([u8; 4]),
    Ipv4Port([u8; 4], u16),
}

impl NodeId {
    pub fn mac(mac: MacAddr) -> Self {
        NodeId::LinkLayer([mac.0, mac.1, mac.2, mac.3, mac.4, mac.5])
    }

    pub fn ipv4(addr: Ipv4Addr) -> Self {
        NodeId::Ipv4(addr.octets())
    }

    pub fn ipv4_port(addr: Ipv4Addr, port: u16) -> Self {
        NodeId::Ipv4Port(addr.octets(), port)
    }

    pub fn mode(&self) -> CaptureMode {
        match self {
            NodeId::LinkLayer(_) => CaptureMode::Link,
            NodeId::Ipv4(_) => CaptureMode::Ip,
            NodeId::Ipv4Port(..) => CaptureMode::Tcp,
        }
    }

    /// Numeric rendering, used until a resolver supplies a better name.
    pub fn numeric_name(&self) -> String {
        self.to_string()
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::LinkLayer(b) => write!(f, "{}", MacAddr::new(b[0], b[1], b[2], b[3], b[4], b[5])),
            NodeId::Ipv4(b) => write!(f, "{}", Ipv4Addr::from(*b)),
            NodeId::Ipv4Port(b, port) => write!(f, "{}:{}", Ipv4Addr::from(*b), port),
        }
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(sock) = s.parse::<SocketAddrV4>() {
            return Ok(NodeId::ipv4_port(*sock.ip(), sock.port()));
        }
        if let Ok(ip) = s.parse::<Ipv4Addr>() {
            return Ok(NodeId::ipv4(ip));
        }
        match s.parse::<MacAddr>() {
            Ok(mac) => Ok(NodeId::mac(mac)),
            Err(_) => Err(format!("invalid node id: {}", s)),
        }
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Ordered pair of endpoints. Orientation is fixed by whoever builds it.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Pair<T> {
    src: T,
    dst: T,
}

impl<T: Copy> Pair<T> {
    pub fn new(src: T, dst: T) -> Self {
        Pair { src, dst }
    }

    pub fn src(&self) -> T {
        self.src
    }

    pub fn dst(&self) -> T {
        self.dst
    }
}

pub type LinkId = Pair<NodeId>;

impl Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// Endpoint pair that ignores orientation, for tables keyed by "the
/// conversation between a and b" regardless of who spoke first.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EndpointPair {
    low: NodeId,
    high: NodeId,
}

impl EndpointPair {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            EndpointPair { low: a, high: b }
        } else {
            EndpointPair { low: b, high: a }
        }
    }
}

impl From<LinkId> for EndpointPair {
    fn from(link: LinkId) -> Self {
        EndpointPair::new(link.src(), link.dst())
    }
}
