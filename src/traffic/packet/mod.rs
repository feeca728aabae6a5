mod direction;
mod record;
mod window;

pub use direction::Direction;
pub use record::PacketRecord;
pub use record::SharedPacket;
pub use window::Membership;
pub use window::PacketWindow;
