pub mod catalog;
pub mod conversations;
pub mod link;
pub mod node;

pub use catalog::{EntityCatalog, Tracked};
pub use conversations::ConversationTable;
pub use link::Link;
pub use node::Node;
