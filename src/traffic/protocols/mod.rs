mod names;
mod protocol_stack;

pub use names::ProtocolNames;
pub use names::LEVELS;
pub use protocol_stack::ProtocolEntry;
pub use protocol_stack::ProtocolStack;
