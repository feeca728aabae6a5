use std::time::Duration;

pub struct Settings {}

impl Settings {
    /// Number of protocol levels tracked below the topmost level 0.
    pub const STACK_SIZE: usize = 5;
    /// Name stored for a level the decoder could not classify.
    pub const UNKNOWN_PROTOCOL: &str = "UNKNOWN";
    pub const AVERAGING_TIME: Duration = Duration::from_millis(2000);
    pub const NODE_TIMEOUT: Duration = Duration::from_secs(120);
    pub const LINK_TIMEOUT: Duration = Duration::from_secs(20);
    // Protocol timeouts are usually longer than entity timeouts.
    pub const PROTO_NODE_TIMEOUT: Duration = Duration::from_secs(60);
    pub const PROTO_TIMEOUT: Duration = Duration::from_secs(600);
    pub const REFRESH_PERIOD: Duration = Duration::from_millis(800);
    // Bits per byte times microseconds per second.
    pub const BPS_FACTOR: f64 = 8_000_000.0;
}
